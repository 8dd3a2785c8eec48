use crate::cli::counters::ScanCounters;
use crate::error::{KatssError, Result};
use crate::kmers::count_table::CountTable;
use crate::kmers::kmer_codec::{KmerKey, KmerSpec};
use crate::kmers::options::CountOptions;
use crate::kmers::scheduler::{RecordWorker, ScanReport, WorkerPool};
use crate::seqfile::ChunkSource;
use tracing::info;

/// Thread-local key buffer in front of a shared [`CountTable`].
pub struct CountWorker<'t> {
    table: &'t CountTable,
    spec: KmerSpec,
    keys: Vec<KmerKey>,
    flush_threshold: usize,
}

impl<'t> CountWorker<'t> {
    pub fn new(table: &'t CountTable, spec: KmerSpec, flush_threshold: usize) -> Result<Self> {
        let mut keys = Vec::new();
        keys.try_reserve_exact(flush_threshold)
            .map_err(|_| KatssError::Allocation {
                what: "worker key buffer",
                bytes: flush_threshold.saturating_mul(std::mem::size_of::<KmerKey>()),
            })?;
        Ok(CountWorker {
            table,
            spec,
            keys,
            flush_threshold,
        })
    }

    fn flush(&mut self) {
        if !self.keys.is_empty() {
            self.table.increment_many(&self.keys);
            self.keys.clear();
        }
    }
}

impl RecordWorker for CountWorker<'_> {
    type Counters = ScanCounters;

    fn visit(&mut self, record: &[u8], counters: &mut ScanCounters) -> Result<()> {
        counters.records += 1;
        let mut scanner = self.spec.scan(record);
        let mut valid = 0u64;
        for key in scanner.by_ref() {
            self.keys.push(key);
            valid += 1;
            if self.keys.len() >= self.flush_threshold {
                self.flush();
            }
        }
        let seen = scanner.windows_seen() as u64;
        counters.windows += seen;
        counters.counted += valid;
        counters.skipped += seen - valid;
        Ok(())
    }

    fn finish(&mut self, _counters: &mut ScanCounters) -> Result<()> {
        self.flush();
        Ok(())
    }
}

/// Add every encodable window of `source` to `table`.
///
/// Worker failures do not discard the counts of the other workers; check
/// [`ScanReport::failures`] or call [`ScanReport::into_result`].
pub fn count_source<S>(
    source: &S,
    table: &CountTable,
    options: &CountOptions,
) -> Result<ScanReport<ScanCounters>>
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
    let report = pool.run(source, options.chunk_size, |_| {
        CountWorker::new(table, spec, options.flush_threshold)
    })?;
    info!(
        k = options.k,
        threads = pool.threads(),
        records = report.counters.records,
        counted = report.counters.counted,
        skipped = report.counters.skipped,
        "counted k-mers"
    );
    Ok(report)
}
