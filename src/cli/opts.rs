use crate::kmers::count_table::Storage;
use crate::kmers::options::{CountOptions, DEFAULT_CHUNK_SIZE, DEFAULT_FLUSH_THRESHOLD};
use clap::{value_parser, Args};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct IOArgs {
    /// Sequence file: FASTA, FASTQ or one sequence per line, optionally gzipped [path]
    #[clap(
        short = 'i',
        long,
        value_parser,
        required = true,
        help_heading = "Core"
    )]
    pub input: PathBuf,

    /// Output directory for results [path]
    #[clap(
        short = 'o',
        long,
        value_parser,
        required = true,
        help_heading = "Core"
    )]
    pub output_dir: PathBuf,

    /// Number of threads to use (max. 128) [integer]
    #[clap(short = 't', long, default_value = "1", help_heading = "Core")]
    pub n_threads: usize,
}

#[derive(Debug, Args)]
pub struct KmerArgs {
    /// K-mer size [integer]
    #[clap(short = 'k', long, default_value = "5", value_parser = value_parser!(u8).range(1..=16), help_heading = "Core")]
    pub kmer_size: u8,

    /// Write k-mers with U instead of T [flag]
    #[clap(short = 'u', long, help_heading = "Core")]
    pub use_u: bool,

    /// Store counts in a hash map instead of a dense array [flag]
    ///
    /// Dense arrays hold 4^k counts and are used up to k = 12 by default.
    #[clap(long, help_heading = "Performance")]
    pub sparse: bool,

    /// Bytes of sequence records handed to a thread at a time [integer]
    #[clap(long, default_value_t = DEFAULT_CHUNK_SIZE, value_parser = value_parser!(usize), help_heading = "Performance")]
    pub chunk_size: usize,

    /// K-mers buffered per thread before updating the shared table [integer]
    #[clap(long, default_value_t = DEFAULT_FLUSH_THRESHOLD, value_parser = value_parser!(usize), help_heading = "Performance")]
    pub flush_threshold: usize,
}

impl KmerArgs {
    pub fn count_options(&self, n_threads: usize) -> CountOptions {
        CountOptions::new(self.kmer_size as usize)
            .with_threads(n_threads)
            .with_chunk_size(self.chunk_size)
            .with_flush_threshold(self.flush_threshold)
            .with_storage(if self.sparse {
                Storage::Sparse
            } else {
                Storage::Auto
            })
            .with_use_t(!self.use_u)
    }
}
