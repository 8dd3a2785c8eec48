//! Sequence files: format and compression detection, and a record reader
//! that several workers can share.

pub mod format;
pub mod reader;

pub use format::{detect_format_from, SeqFormat};
pub use reader::{detect_format, open_reader, ChunkSource, Compression, SeqFile};
