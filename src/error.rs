use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the counting, uncounting and profiling sessions.
///
/// Windows that fail to encode and decrements that would underflow are not
/// errors; they are reported through counters instead.
#[derive(Debug, Error)]
pub enum KatssError {
    /// The input could not be opened or read.
    #[error("cannot open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input is neither FASTA, FASTQ nor one sequence per line.
    #[error(
        "unable to read sequences from {path:?}; supported formats are FASTA, FASTQ \
         and files with one sequence per line"
    )]
    UnrecognizedFormat { path: PathBuf },

    /// I/O error while reading an already opened source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A table or worker buffer could not be allocated.
    #[error("failed to allocate {what} ({bytes} bytes)")]
    Allocation { what: &'static str, bytes: usize },

    #[error("illegal k-mer size {0}; must be between 1 and 16")]
    InvalidKmerSize(usize),

    #[error("value index {index} out of range for a table with {cols} columns")]
    ColumnOutOfRange { index: usize, cols: usize },

    #[error("motif to remove must not be empty")]
    EmptyMotif,

    #[error("k-mer sizes differ: {0} vs {1}")]
    KmerSizeMismatch(usize, usize),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// One or more workers stopped before the source was exhausted.
    #[error("{failed} of {workers} workers stopped early: {reason}")]
    PartialResult {
        failed: usize,
        workers: usize,
        reason: String,
    },

    #[error("building worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, KatssError>;
