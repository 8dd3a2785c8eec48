pub mod counters;
pub mod io;
pub mod opts;

/// Integer type used for every k-mer count
pub type BigCount = u64;
