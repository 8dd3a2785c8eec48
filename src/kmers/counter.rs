use crate::cli::counters::ScanCounters;
use crate::cli::BigCount;
use crate::error::Result;
use crate::kmers::count_table::CountTable;
use crate::kmers::counting;
use crate::kmers::kmer_codec::{KmerKey, KmerSpec};
use crate::kmers::ledger::RemovalLedger;
use crate::kmers::motif_search::Motif;
use crate::kmers::options::CountOptions;
use crate::kmers::uncount::{uncount_source, UncountReport};
use crate::seqfile::{detect_format, ChunkSource, SeqFile};
use std::path::Path;

/// A counted table together with the motifs removed from it so far.
///
/// The table is only handed out by shared reference; all mutation goes
/// through [`KmerCounter::uncount`], which takes `&mut self`, so workers can
/// read the ledger without a lock.
#[derive(Debug)]
pub struct KmerCounter {
    options: CountOptions,
    spec: KmerSpec,
    table: CountTable,
    ledger: RemovalLedger,
    scan: ScanCounters,
}

impl KmerCounter {
    /// An empty session.
    pub fn new(options: CountOptions) -> Result<Self> {
        options.validate()?;
        let table = CountTable::new(options.k, options.storage)?;
        Ok(KmerCounter {
            spec: KmerSpec {
                k: options.k,
                use_t: options.use_t,
            },
            options,
            table,
            ledger: RemovalLedger::new(),
            scan: ScanCounters::default(),
        })
    }

    /// Count every k-mer of `source`.
    ///
    /// If any worker stops early the partial table is dropped and
    /// [`KatssError::PartialResult`](crate::KatssError::PartialResult) is returned.
    pub fn count_source<S>(source: &S, options: CountOptions) -> Result<Self>
    where
        S: ChunkSource + ?Sized,
    {
        let mut counter = Self::new(options)?;
        let report = counting::count_source(source, &counter.table, &counter.options)?;
        counter.scan = report.into_result()?;
        Ok(counter)
    }

    /// Count every k-mer of the file at `path`, detecting format and
    /// compression.
    pub fn count_path(path: &Path, options: CountOptions) -> Result<Self> {
        options.validate()?;
        let source = SeqFile::open_detected(path)?;
        Self::count_source(&source, options)
    }

    /// Remove the windows overlapping every occurrence of `motif` in `source`.
    ///
    /// `source` must hold the records this table was counted from. The motif
    /// is added to the ledger even when it does not occur.
    ///
    /// If a worker stops early, the decrements already made are undone and
    /// [`KatssError::PartialResult`](crate::KatssError::PartialResult) is
    /// returned; the table and the ledger are as they were before the call.
    pub fn uncount<S>(&mut self, source: &S, motif: &str) -> Result<UncountReport>
    where
        S: ChunkSource + ?Sized,
    {
        let motif = Motif::new(motif)?;
        let before = self.table.total();
        let report = uncount_source(source, &self.table, &self.ledger, &motif, &self.options)?;
        let counters = report.into_result()?;
        let drop = before - self.table.total();
        let report = UncountReport::new(&motif, counters, drop);
        self.ledger.push(motif);
        Ok(report)
    }

    /// [`KmerCounter::uncount`] over the file at `path`.
    ///
    /// The motif and the file format are checked before the table is touched.
    pub fn uncount_path(&mut self, path: &Path, motif: &str) -> Result<UncountReport> {
        Motif::new(motif)?;
        let format = detect_format(path)?;
        let source = SeqFile::open(path, format)?;
        self.uncount(&source, motif)
    }

    pub fn spec(&self) -> &KmerSpec {
        &self.spec
    }

    pub fn k(&self) -> usize {
        self.spec.k
    }

    pub fn options(&self) -> &CountOptions {
        &self.options
    }

    pub fn table(&self) -> &CountTable {
        &self.table
    }

    pub fn ledger(&self) -> &RemovalLedger {
        &self.ledger
    }

    /// Removed motifs, in removal order.
    pub fn removed(&self) -> Vec<&str> {
        self.ledger.iter().map(Motif::as_str).collect()
    }

    /// Counters of the counting scan.
    pub fn scan_counters(&self) -> &ScanCounters {
        &self.scan
    }

    pub fn get(&self, key: KmerKey) -> BigCount {
        self.table.get(key)
    }

    /// Count of a k-mer given as text; `None` if it is not a valid k-mer.
    pub fn get_kmer(&self, kmer: &str) -> Option<BigCount> {
        if kmer.len() != self.spec.k {
            return None;
        }
        self.spec
            .encode(kmer.as_bytes(), 0)
            .map(|key| self.table.get(key))
    }

    pub fn total(&self) -> BigCount {
        self.table.total()
    }
}
