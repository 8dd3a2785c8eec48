use crate::error::{KatssError, Result};
use crate::kmers::options::MAX_THREADS;
use crate::seqfile::ChunkSource;
use std::ops::{AddAssign, Range};
use tracing::{debug, warn};

/// Per-thread state of a scan: receives every record of every chunk the
/// thread pulls from the source.
pub trait RecordWorker {
    type Counters: Default + AddAssign + Send;

    /// Process the sequence of one record. FASTA bodies may contain line breaks.
    fn visit(&mut self, record: &[u8], counters: &mut Self::Counters) -> Result<()>;

    /// Flush anything still buffered. Called once, also after a failure.
    fn finish(&mut self, counters: &mut Self::Counters) -> Result<()>;
}

/// Outcome of one pool run.
#[derive(Debug)]
pub struct ScanReport<C> {
    /// Sum of the counters of every worker, including failed ones
    pub counters: C,
    pub workers: usize,
    /// One message per worker that stopped before the source was exhausted
    pub failures: Vec<String>,
}

impl<C> ScanReport<C> {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// The counters, or [`KatssError::PartialResult`] if any worker failed.
    pub fn into_result(self) -> Result<C> {
        if self.failures.is_empty() {
            Ok(self.counters)
        } else {
            Err(KatssError::PartialResult {
                failed: self.failures.len(),
                workers: self.workers,
                reason: self.failures.join("; "),
            })
        }
    }
}

/// Fixed number of peer workers sharing one [`ChunkSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerPool {
    threads: usize,
}

impl WorkerPool {
    /// Clamp `threads` into `1..=128`.
    pub fn new(threads: usize) -> Self {
        let clamped = threads.clamp(1, MAX_THREADS);
        if clamped != threads {
            warn!(requested = threads, using = clamped, "thread count clamped");
        }
        WorkerPool { threads: clamped }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run one worker per thread until `source` is exhausted.
    ///
    /// `make_worker` is called on each pool thread with the worker index; an
    /// error there (e.g. a failed buffer allocation) only stops that worker.
    /// Chunk requests take the source's lock and release it before a worker
    /// touches any table, so the two locks are never held together.
    pub fn run<S, W, F>(
        &self,
        source: &S,
        chunk_size: usize,
        make_worker: F,
    ) -> Result<ScanReport<W::Counters>>
    where
        S: ChunkSource + ?Sized,
        W: RecordWorker,
        F: Fn(usize) -> Result<W> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(|i| format!("katss-worker-{i}"))
            .build()?;

        let outcomes = pool.broadcast(|ctx| run_worker(ctx.index(), source, chunk_size, &make_worker));

        let mut counters = W::Counters::default();
        let mut failures = Vec::new();
        for (worker, (c, err)) in outcomes.into_iter().enumerate() {
            counters += c;
            if let Some(e) = err {
                warn!(worker, error = %e, "worker stopped early");
                failures.push(format!("worker {worker}: {e}"));
            }
        }
        Ok(ScanReport {
            counters,
            workers: self.threads,
            failures,
        })
    }
}

fn run_worker<S, W, F>(
    id: usize,
    source: &S,
    chunk_size: usize,
    make_worker: &F,
) -> (W::Counters, Option<KatssError>)
where
    S: ChunkSource + ?Sized,
    W: RecordWorker,
    F: Fn(usize) -> Result<W>,
{
    let mut counters = W::Counters::default();
    let mut worker = match make_worker(id) {
        Ok(w) => w,
        Err(e) => return (counters, Some(e)),
    };

    let mut chunk: Vec<u8> = Vec::new();
    if chunk.try_reserve(chunk_size).is_err() {
        return (
            counters,
            Some(KatssError::Allocation {
                what: "worker chunk buffer",
                bytes: chunk_size,
            }),
        );
    }

    let format = source.format();
    let mut records: Vec<Range<usize>> = Vec::new();
    let mut chunks = 0u64;
    let mut error = None;

    'scan: loop {
        match source.read_chunk(&mut chunk, chunk_size) {
            Ok(0) => break,
            Ok(_) => chunks += 1,
            Err(e) => {
                error = Some(e);
                break;
            }
        }
        format.records(&chunk, &mut records);
        for r in &records {
            if let Err(e) = worker.visit(&chunk[r.clone()], &mut counters) {
                error = Some(e);
                break 'scan;
            }
        }
    }

    if let Err(e) = worker.finish(&mut counters) {
        if error.is_none() {
            error = Some(e);
        }
    }
    debug!(worker = id, chunks, failed = error.is_some(), "worker finished");
    (counters, error)
}
