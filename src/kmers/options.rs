use crate::error::{KatssError, Result};
use crate::kmers::count_table::Storage;
use crate::kmers::kmer_codec::MAX_K;

/// Bytes of whole records handed to a worker per request.
pub const DEFAULT_CHUNK_SIZE: usize = 65_536;
/// Keys buffered by a worker before it takes the table lock.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 250_000;
pub const MAX_THREADS: usize = 128;

/// Settings of one counting or uncounting session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountOptions {
    /// Window length
    pub k: usize,
    /// Worker threads; clamped into `1..=128` when the pool is built
    pub threads: usize,
    pub chunk_size: usize,
    pub flush_threshold: usize,
    pub storage: Storage,
    /// Decode base 3 as `T` (true) or `U` (false)
    pub use_t: bool,
}

impl Default for CountOptions {
    fn default() -> Self {
        CountOptions {
            k: 5,
            threads: 1,
            chunk_size: DEFAULT_CHUNK_SIZE,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            storage: Storage::Auto,
            use_t: true,
        }
    }
}

impl CountOptions {
    pub fn new(k: usize) -> Self {
        CountOptions {
            k,
            ..Default::default()
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_flush_threshold(mut self, flush_threshold: usize) -> Self {
        self.flush_threshold = flush_threshold;
        self
    }

    pub fn with_storage(mut self, storage: Storage) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_use_t(mut self, use_t: bool) -> Self {
        self.use_t = use_t;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.k < 1 || self.k > MAX_K {
            return Err(KatssError::InvalidKmerSize(self.k));
        }
        if self.chunk_size == 0 {
            return Err(KatssError::InvalidOption("chunk size must be positive".into()));
        }
        if self.flush_threshold == 0 {
            return Err(KatssError::InvalidOption(
                "flush threshold must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Settings of an iterative k-mer knockout run.
#[derive(Clone, Debug, PartialEq)]
pub struct IkkeOptions {
    pub count: CountOptions,
    /// Number of top k-mers to report and knock out
    pub iterations: usize,
    /// Report log2 enrichments
    pub normalize: bool,
}

impl Default for IkkeOptions {
    fn default() -> Self {
        IkkeOptions {
            count: CountOptions::default(),
            iterations: 10,
            normalize: false,
        }
    }
}
