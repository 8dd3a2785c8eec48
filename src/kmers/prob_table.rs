use crate::error::{KatssError, Result};
use crate::kmers::kmer_codec::{num_keys, KmerKey, MAX_K};
use fxhash::FxHashMap;
use parking_lot::Mutex;
use smallvec::{smallvec, SmallVec};

/// Positional sums of one k-mer followed by its occurrence counter.
pub type ProbabilityRow = SmallVec<[f64; MAX_K + 1]>;

/// Per-k-mer positional value sums, `k + 1` columns per key.
///
/// Columns `0..k` accumulate a per-position value of every occurrence,
/// column `k` counts occurrences. [`ProbabilityTable::finalize`] turns the
/// sums into means.
pub struct ProbabilityTable {
    k: usize,
    cols: usize,
    num_keys: u64,
    entries: Mutex<FxHashMap<KmerKey, ProbabilityRow>>,
    finalized: bool,
}

impl ProbabilityTable {
    pub fn new(k: usize) -> Result<Self> {
        if k < 1 || k > MAX_K {
            return Err(KatssError::InvalidKmerSize(k));
        }
        Ok(ProbabilityTable {
            k,
            cols: k + 1,
            num_keys: num_keys(k),
            entries: Mutex::new(FxHashMap::default()),
            finalized: false,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Add `value` to column `index` of `key`, creating a zeroed row first.
    pub fn add_value(&self, key: KmerKey, value: f64, index: usize) -> Result<()> {
        if index >= self.cols {
            return Err(KatssError::ColumnOutOfRange {
                index,
                cols: self.cols,
            });
        }
        assert!(
            (key as u64) < self.num_keys,
            "k-mer key {key} out of range for k = {}",
            self.k
        );
        let cols = self.cols;
        let mut entries = self.entries.lock();
        entries.entry(key).or_insert_with(|| smallvec![0.0; cols])[index] += value;
        Ok(())
    }

    /// Divide every positional sum by its occurrence counter.
    ///
    /// Rows with a counter below 1 are left as they are. Calling this again
    /// does nothing.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        let k = self.k;
        for row in self.entries.get_mut().values_mut() {
            let n = row[k];
            if n < 1.0 {
                continue;
            }
            for v in row[..k].iter_mut() {
                *v /= n;
            }
        }
        self.finalized = true;
    }

    pub fn get(&self, key: KmerKey) -> Option<ProbabilityRow> {
        self.entries.lock().get(&key).cloned()
    }

    /// Occurrence counter of `key`.
    pub fn occurrences(&self, key: KmerKey) -> f64 {
        self.entries.lock().get(&key).map_or(0.0, |row| row[self.k])
    }

    /// All rows, in key order.
    pub fn entries(&self) -> Vec<(KmerKey, ProbabilityRow)> {
        let mut rows: Vec<_> = self
            .entries
            .lock()
            .iter()
            .map(|(&key, row)| (key, row.clone()))
            .collect();
        rows.sort_unstable_by_key(|&(key, _)| key);
        rows
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ProbabilityTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbabilityTable")
            .field("k", &self.k)
            .field("entries", &self.len())
            .field("finalized", &self.finalized)
            .finish()
    }
}
