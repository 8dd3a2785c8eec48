use crate::cli::counters::UncountCounters;
use crate::cli::BigCount;
use crate::error::{KatssError, Result};
use crate::kmers::count_table::CountTable;
use crate::kmers::kmer_codec::{encode_base, KmerKey, KmerSpec, LINE_BREAK};
use crate::kmers::ledger::RemovalLedger;
use crate::kmers::motif_search::Motif;
use crate::kmers::options::CountOptions;
use crate::kmers::scheduler::{RecordWorker, ScanReport, WorkerPool};
use crate::seqfile::ChunkSource;
use parking_lot::Mutex;
use tracing::{info, warn};

/// Summary of one motif removal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UncountReport {
    pub motif: String,
    pub records: u64,
    /// Occurrences of the motif left after masking earlier removals
    pub occurrences: u64,
    /// Windows whose count was lowered by one
    pub decremented: u64,
    /// Windows overlapping an occurrence that failed to encode
    pub skipped: u64,
    /// Decrements that found a zero count
    pub underflows: u64,
    /// Drop of the table total
    pub total_drop: BigCount,
}

impl UncountReport {
    pub fn new(motif: &Motif, counters: UncountCounters, total_drop: BigCount) -> Self {
        UncountReport {
            motif: motif.as_str().to_string(),
            records: counters.records,
            occurrences: counters.occurrences,
            decremented: counters.decremented,
            skipped: counters.skipped,
            underflows: counters.underflows,
            total_drop,
        }
    }
}

/// Call `f` for every window start of length `k` in `seq` that overlaps an
/// occurrence of `motif`. Overlapping occurrences share their windows, so
/// every start is visited at most once. Returns the number of occurrences.
pub fn for_each_overlapping_window(
    seq: &[u8],
    motif: &Motif,
    k: usize,
    mut f: impl FnMut(usize),
) -> u64 {
    let starts = (seq.len() + 1).saturating_sub(k);
    let mut next_start = 0usize;
    let mut occurrences = 0u64;
    let mut from = 0usize;
    while let Some(p) = motif.find(seq, from) {
        occurrences += 1;
        let lo = (p + 1).saturating_sub(k).max(next_start);
        let hi = (p + motif.len()).min(starts);
        for s in lo..hi {
            f(s);
        }
        next_start = next_start.max(hi);
        from = p + 1;
    }
    occurrences
}

struct UncountWorker<'a> {
    table: &'a CountTable,
    ledger: &'a RemovalLedger,
    motif: &'a Motif,
    spec: KmerSpec,
    scratch: Vec<u8>,
    keys: Vec<KmerKey>,
    flush_threshold: usize,
    // keys this worker actually decremented
    applied: Vec<KmerKey>,
    journals: &'a Mutex<Vec<Vec<KmerKey>>>,
}

impl<'a> UncountWorker<'a> {
    fn new(
        table: &'a CountTable,
        ledger: &'a RemovalLedger,
        motif: &'a Motif,
        spec: KmerSpec,
        flush_threshold: usize,
        journals: &'a Mutex<Vec<Vec<KmerKey>>>,
    ) -> Result<Self> {
        let mut keys = Vec::new();
        keys.try_reserve_exact(flush_threshold)
            .map_err(|_| KatssError::Allocation {
                what: "worker key buffer",
                bytes: flush_threshold.saturating_mul(std::mem::size_of::<KmerKey>()),
            })?;
        Ok(UncountWorker {
            table,
            ledger,
            motif,
            spec,
            scratch: Vec::new(),
            keys,
            flush_threshold,
            applied: Vec::new(),
            journals,
        })
    }

    /// Decrement the buffered keys. Journal space is reserved first, so
    /// every applied decrement is recorded.
    fn flush(&mut self, counters: &mut UncountCounters) -> Result<()> {
        if self.keys.is_empty() {
            return Ok(());
        }
        self.applied
            .try_reserve(self.keys.len())
            .map_err(|_| KatssError::Allocation {
                what: "uncount journal",
                bytes: self.keys.len().saturating_mul(std::mem::size_of::<KmerKey>()),
            })?;
        let underflows = self.table.decrement_many_into(&self.keys, &mut self.applied) as u64;
        counters.decremented += self.keys.len() as u64 - underflows;
        counters.underflows += underflows;
        self.keys.clear();
        Ok(())
    }
}

impl RecordWorker for UncountWorker<'_> {
    type Counters = UncountCounters;

    fn visit(&mut self, record: &[u8], counters: &mut UncountCounters) -> Result<()> {
        counters.records += 1;
        self.scratch.clear();
        self.scratch.extend(
            record
                .iter()
                .copied()
                .filter(|&b| encode_base(b) != LINE_BREAK),
        );
        self.ledger.mask(&mut self.scratch);

        let seq = &self.scratch;
        let spec = self.spec;
        let keys = &mut self.keys;
        let mut skipped = 0u64;
        counters.occurrences += for_each_overlapping_window(seq, self.motif, spec.k, |s| {
            match spec.encode(seq, s) {
                Some(key) => keys.push(key),
                None => skipped += 1,
            }
        });
        counters.skipped += skipped;

        if self.keys.len() >= self.flush_threshold {
            self.flush(counters)?;
        }
        Ok(())
    }

    fn finish(&mut self, counters: &mut UncountCounters) -> Result<()> {
        let flushed = self.flush(counters);
        self.journals.lock().push(std::mem::take(&mut self.applied));
        flushed
    }
}

/// Decrement every window of `source` overlapping an occurrence of `motif`,
/// with occurrences of the motifs in `ledger` masked first.
///
/// The ledger is only read; appending `motif` is left to the owner of the
/// table once this returns. If any worker stops early, every decrement of
/// the run is undone before returning, so an incomplete report always comes
/// with the table as it was.
pub fn uncount_source<S>(
    source: &S,
    table: &CountTable,
    ledger: &RemovalLedger,
    motif: &Motif,
    options: &CountOptions,
) -> Result<ScanReport<UncountCounters>>
where
    S: ChunkSource + ?Sized,
{
    options.validate()?;
    if table.k() != options.k {
        return Err(KatssError::KmerSizeMismatch(table.k(), options.k));
    }
    let spec = KmerSpec {
        k: options.k,
        use_t: options.use_t,
    };
    let pool = WorkerPool::new(options.threads);
    let journals = Mutex::new(Vec::with_capacity(pool.threads()));
    let report = pool.run(source, options.chunk_size, |_| {
        UncountWorker::new(table, ledger, motif, spec, options.flush_threshold, &journals)
    })?;

    if !report.is_complete() {
        let journals = journals.into_inner();
        for applied in &journals {
            table.increment_many(applied);
        }
        let restored: usize = journals.iter().map(Vec::len).sum();
        warn!(%motif, restored, "uncount stopped early; table restored");
        return Ok(report);
    }

    let c = &report.counters;
    if c.underflows > 0 {
        warn!(
            %motif,
            underflows = c.underflows,
            "decrements hit zero counts; the source differs from the counted one"
        );
    }
    info!(
        %motif,
        occurrences = c.occurrences,
        decremented = c.decremented,
        skipped = c.skipped,
        "removed motif"
    );
    Ok(report)
}
