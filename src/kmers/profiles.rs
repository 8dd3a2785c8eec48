use crate::cli::counters::ScanCounters;
use crate::error::{KatssError, Result};
use crate::kmers::kmer_codec::{encode_base, KmerSpec, LINE_BREAK};
use crate::kmers::options::CountOptions;
use crate::kmers::prob_table::ProbabilityTable;
use crate::kmers::scheduler::{RecordWorker, ScanReport, WorkerPool};
use crate::seqfile::{ChunkSource, SeqFile};
use std::path::Path;
use tracing::info;

/// Per-position values of a sequence, e.g. unpaired probabilities from an
/// RNA folding library. Must return one value per base of `seq`; missing
/// positions are read as 0.
pub trait PositionProfiler: Sync {
    fn profile(&self, seq: &[u8]) -> Vec<f64>;
}

impl<F> PositionProfiler for F
where
    F: Fn(&[u8]) -> Vec<f64> + Sync,
{
    fn profile(&self, seq: &[u8]) -> Vec<f64> {
        self(seq)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileOptions {
    pub count: CountOptions,
    /// Profile overlapping windows of this many bases and average them
    pub window_size: Option<usize>,
}

/// Profile `seq` whole, or as the per-position mean over every window of
/// `window_size` bases when the sequence is longer than one window.
pub fn windowed_profile<P>(profiler: &P, seq: &[u8], window_size: Option<usize>) -> Vec<f64>
where
    P: PositionProfiler + ?Sized,
{
    let w = match window_size {
        Some(w) if w > 0 && w < seq.len() => w,
        _ => return profiler.profile(seq),
    };
    let mut sums = vec![0.0; seq.len()];
    let mut covered = vec![0u32; seq.len()];
    for start in 0..=seq.len() - w {
        let values = profiler.profile(&seq[start..start + w]);
        for (j, v) in values.into_iter().take(w).enumerate() {
            sums[start + j] += v;
            covered[start + j] += 1;
        }
    }
    sums.iter()
        .zip(&covered)
        .map(|(&s, &n)| if n > 0 { s / n as f64 } else { 0.0 })
        .collect()
}

struct ProfileWorker<'a, P: ?Sized> {
    table: &'a ProbabilityTable,
    profiler: &'a P,
    spec: KmerSpec,
    window_size: Option<usize>,
    scratch: Vec<u8>,
}

impl<P: PositionProfiler + ?Sized> RecordWorker for ProfileWorker<'_, P> {
    type Counters = ScanCounters;

    fn visit(&mut self, record: &[u8], counters: &mut ScanCounters) -> Result<()> {
        counters.records += 1;
        self.scratch.clear();
        self.scratch.extend(
            record
                .iter()
                .copied()
                .filter(|&b| encode_base(b) != LINE_BREAK),
        );
        let seq = &self.scratch;
        let k = self.spec.k;
        if seq.len() < k {
            return Ok(());
        }
        let profile = windowed_profile(self.profiler, seq, self.window_size);
        for s in 0..=seq.len() - k {
            counters.windows += 1;
            let Some(key) = self.spec.encode(seq, s) else {
                counters.skipped += 1;
                continue;
            };
            for i in 0..k {
                let value = profile.get(s + i).copied().unwrap_or(0.0);
                self.table.add_value(key, value, i)?;
            }
            self.table.add_value(key, 1.0, k)?;
            counters.counted += 1;
        }
        Ok(())
    }

    fn finish(&mut self, _counters: &mut ScanCounters) -> Result<()> {
        Ok(())
    }
}

/// Accumulate the profile of every encodable window of `source` into `table`.
pub fn profile_source<S, P>(
    source: &S,
    profiler: &P,
    table: &ProbabilityTable,
    options: &ProfileOptions,
) -> Result<ScanReport<ScanCounters>>
where
    S: ChunkSource + ?Sized,
    P: PositionProfiler + ?Sized,
{
    let count = &options.count;
    count.validate()?;
    if table.k() != count.k {
        return Err(KatssError::KmerSizeMismatch(table.k(), count.k));
    }
    let spec = KmerSpec {
        k: count.k,
        use_t: count.use_t,
    };
    let pool = WorkerPool::new(count.threads);
    let report = pool.run(source, count.chunk_size, |_| {
        Ok(ProfileWorker {
            table,
            profiler,
            spec,
            window_size: options.window_size,
            scratch: Vec::new(),
        })
    })?;
    info!(
        k = count.k,
        records = report.counters.records,
        windows = report.counters.counted,
        "profiled k-mers"
    );
    Ok(report)
}

/// Profile every record of `source` into a fresh table and finalize it.
///
/// If any worker stops early the partial table is dropped and
/// [`KatssError::PartialResult`] is returned.
pub fn profile_table<S, P>(source: &S, profiler: &P, options: &ProfileOptions) -> Result<ProbabilityTable>
where
    S: ChunkSource + ?Sized,
    P: PositionProfiler + ?Sized,
{
    options.count.validate()?;
    let mut table = ProbabilityTable::new(options.count.k)?;
    profile_source(source, profiler, &table, options)?.into_result()?;
    table.finalize();
    Ok(table)
}

/// [`profile_table`] over the file at `path`, detecting format and
/// compression.
pub fn profile_path<P>(path: &Path, profiler: &P, options: &ProfileOptions) -> Result<ProbabilityTable>
where
    P: PositionProfiler + ?Sized,
{
    options.count.validate()?;
    let source = SeqFile::open_detected(path)?;
    profile_table(&source, profiler, options)
}
