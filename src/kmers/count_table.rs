use crate::cli::BigCount;
use crate::error::{KatssError, Result};
use crate::kmers::kmer_codec::{num_keys, KmerKey, MAX_K};
use fxhash::FxHashMap;
use parking_lot::Mutex;

/// Largest k stored densely when [`Storage::Auto`] is requested (128 MiB).
pub const AUTO_DENSE_MAX_K: usize = 12;

/// Backing storage of a [`CountTable`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Storage {
    /// One slot per key, allocated up front
    Dense,
    /// Hash map, entries created on first increment
    Sparse,
    /// Dense up to k = 12, sparse above
    #[default]
    Auto,
}

impl Storage {
    /// Whether a table of window length `k` is stored densely.
    pub fn is_dense_for(self, k: usize) -> bool {
        match self {
            Storage::Dense => true,
            Storage::Sparse => false,
            Storage::Auto => k <= AUTO_DENSE_MAX_K,
        }
    }
}

/// Result of a single decrement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decrement {
    Applied,
    /// The count was already zero; it stays at zero.
    Underflow,
}

enum Slots {
    Dense(Vec<BigCount>),
    Sparse(FxHashMap<KmerKey, BigCount>),
}

struct TableState {
    slots: Slots,
    total: BigCount,
}

impl TableState {
    #[inline]
    fn add(&mut self, key: KmerKey) {
        match &mut self.slots {
            Slots::Dense(v) => v[key as usize] += 1,
            Slots::Sparse(m) => *m.entry(key).or_insert(0) += 1,
        }
        self.total += 1;
    }

    #[inline]
    fn sub(&mut self, key: KmerKey) -> Decrement {
        let slot = match &mut self.slots {
            Slots::Dense(v) => v.get_mut(key as usize),
            Slots::Sparse(m) => m.get_mut(&key),
        };
        match slot {
            Some(c) if *c > 0 => {
                *c -= 1;
                self.total -= 1;
                Decrement::Applied
            }
            _ => Decrement::Underflow,
        }
    }

    fn get(&self, key: KmerKey) -> BigCount {
        match &self.slots {
            Slots::Dense(v) => v[key as usize],
            Slots::Sparse(m) => m.get(&key).copied().unwrap_or(0),
        }
    }
}

/// Occurrence counts for every key of one k.
///
/// All reads and writes go through one table-wide lock. Workers are expected
/// to buffer keys locally and use [`CountTable::increment_many`] so the lock
/// is taken once per batch rather than once per window.
pub struct CountTable {
    k: usize,
    num_keys: u64,
    state: Mutex<TableState>,
}

impl CountTable {
    /// Size storage for 4^k keys.
    ///
    /// Dense storage is reserved fallibly; a failed reservation is reported as
    /// [`KatssError::Allocation`] instead of aborting the process.
    pub fn new(k: usize, storage: Storage) -> Result<Self> {
        if k < 1 || k > MAX_K {
            return Err(KatssError::InvalidKmerSize(k));
        }
        let n = num_keys(k);
        let slots = if storage.is_dense_for(k) {
            let len = usize::try_from(n).map_err(|_| KatssError::Allocation {
                what: "dense count table",
                bytes: usize::MAX,
            })?;
            let mut v: Vec<BigCount> = Vec::new();
            v.try_reserve_exact(len)
                .map_err(|_| KatssError::Allocation {
                    what: "dense count table",
                    bytes: len.saturating_mul(std::mem::size_of::<BigCount>()),
                })?;
            v.resize(len, 0);
            Slots::Dense(v)
        } else {
            Slots::Sparse(FxHashMap::default())
        };
        Ok(CountTable {
            k,
            num_keys: n,
            state: Mutex::new(TableState { slots, total: 0 }),
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn num_keys(&self) -> u64 {
        self.num_keys
    }

    pub fn is_dense(&self) -> bool {
        matches!(self.state.lock().slots, Slots::Dense(_))
    }

    #[inline]
    fn check_key(&self, key: KmerKey) {
        assert!(
            (key as u64) < self.num_keys,
            "k-mer key {key} outside the key space of k = {}",
            self.k
        );
    }

    pub fn increment(&self, key: KmerKey) {
        self.check_key(key);
        self.state.lock().add(key);
    }

    /// Add one occurrence for every key in `keys` under a single lock.
    pub fn increment_many(&self, keys: &[KmerKey]) {
        if keys.is_empty() {
            return;
        }
        for &key in keys {
            self.check_key(key);
        }
        let mut state = self.state.lock();
        for &key in keys {
            state.add(key);
        }
    }

    /// Remove one occurrence; a count already at zero is left at zero.
    pub fn decrement(&self, key: KmerKey) -> Decrement {
        self.check_key(key);
        self.state.lock().sub(key)
    }

    /// Decrement every key in `keys` under a single lock.
    /// Returns the number of decrements that underflowed.
    pub fn decrement_many(&self, keys: &[KmerKey]) -> usize {
        if keys.is_empty() {
            return 0;
        }
        for &key in keys {
            self.check_key(key);
        }
        let mut state = self.state.lock();
        keys.iter()
            .filter(|&&key| state.sub(key) == Decrement::Underflow)
            .count()
    }

    /// [`CountTable::decrement_many`], also appending every key that was
    /// actually decremented to `applied`. Replaying `applied` through
    /// [`CountTable::increment_many`] undoes the call.
    pub fn decrement_many_into(&self, keys: &[KmerKey], applied: &mut Vec<KmerKey>) -> usize {
        if keys.is_empty() {
            return 0;
        }
        for &key in keys {
            self.check_key(key);
        }
        let mut state = self.state.lock();
        let mut underflows = 0;
        for &key in keys {
            match state.sub(key) {
                Decrement::Applied => applied.push(key),
                Decrement::Underflow => underflows += 1,
            }
        }
        underflows
    }

    pub fn get(&self, key: KmerKey) -> BigCount {
        self.check_key(key);
        self.state.lock().get(key)
    }

    /// Sum of all counts.
    pub fn total(&self) -> BigCount {
        self.state.lock().total
    }

    /// Every key with a nonzero count, in key order.
    pub fn nonzero_entries(&self) -> Vec<(KmerKey, BigCount)> {
        let state = self.state.lock();
        match &state.slots {
            Slots::Dense(v) => v
                .iter()
                .enumerate()
                .filter(|&(_, &c)| c > 0)
                .map(|(i, &c)| (i as KmerKey, c))
                .collect(),
            Slots::Sparse(m) => {
                let mut out: Vec<(KmerKey, BigCount)> =
                    m.iter().filter(|&(_, &c)| c > 0).map(|(&k, &c)| (k, c)).collect();
                out.sort_unstable_by_key(|&(k, _)| k);
                out
            }
        }
    }
}

impl std::fmt::Debug for CountTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountTable")
            .field("k", &self.k)
            .field("dense", &self.is_dense())
            .field("total", &self.total())
            .finish()
    }
}
