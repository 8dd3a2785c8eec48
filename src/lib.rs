pub mod cli;
pub mod error;
pub mod kmers;
pub mod seqfile;

pub use error::{KatssError, Result};
