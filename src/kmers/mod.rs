pub mod count_table;
pub mod counter;
pub mod counting;
pub mod enrichment;
pub mod kmer_codec;
pub mod ledger;
pub mod motif_search;
pub mod options;
pub mod prob_table;
pub mod profiles;
pub mod scheduler;
pub mod uncount;
pub mod write;

pub use count_table::{CountTable, Decrement, Storage};
pub use counter::KmerCounter;
pub use kmer_codec::{build_kmer_spec, KmerKey, KmerSpec};
pub use options::{CountOptions, IkkeOptions};
pub use prob_table::ProbabilityTable;
pub use uncount::UncountReport;
