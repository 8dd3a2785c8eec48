use crate::error::{KatssError, Result};
use crate::kmers::counter::KmerCounter;
use crate::kmers::kmer_codec::KmerKey;
use crate::kmers::options::{CountOptions, IkkeOptions};
use fxhash::FxHashMap;
use std::path::Path;
use tracing::info;

/// Enrichment of one k-mer in a test set relative to a control set.
#[derive(Clone, Debug, PartialEq)]
pub struct Enrichment {
    pub key: KmerKey,
    pub kmer: String,
    /// `(test / test_total) / (ctrl / ctrl_total)`, or its log2. Against a
    /// [`BackgroundModel`] the control frequency is the predicted one.
    pub value: f64,
}

fn check_k(test: &KmerCounter, ctrl: &KmerCounter) -> Result<()> {
    if test.k() != ctrl.k() {
        return Err(KatssError::KmerSizeMismatch(test.k(), ctrl.k()));
    }
    Ok(())
}

/// Frequency ratios in key order, for keys counted in both tables.
fn ratios(test: &KmerCounter, ctrl: &KmerCounter, normalize: bool) -> Vec<Enrichment> {
    let test_total = test.total() as f64;
    let ctrl_total = ctrl.total() as f64;
    if test_total == 0.0 || ctrl_total == 0.0 {
        return Vec::new();
    }
    let ctrl_counts: FxHashMap<KmerKey, u64> = ctrl.table().nonzero_entries().into_iter().collect();
    test.table()
        .nonzero_entries()
        .into_iter()
        .filter_map(|(key, t)| {
            let c = *ctrl_counts.get(&key)?;
            let r = (t as f64 / test_total) / (c as f64 / ctrl_total);
            Some(Enrichment {
                key,
                kmer: test.spec().decode(key),
                value: if normalize { r.log2() } else { r },
            })
        })
        .collect()
}

fn ranked(mut rows: Vec<Enrichment>) -> Vec<Enrichment> {
    rows.sort_by(|a, b| b.value.total_cmp(&a.value).then(a.key.cmp(&b.key)));
    rows
}

/// Rows arrive in key order, so keeping the first maximum keeps the lowest key.
fn best(rows: Vec<Enrichment>) -> Option<Enrichment> {
    let mut best: Option<Enrichment> = None;
    for row in rows {
        if best.as_ref().map_or(true, |b| row.value > b.value) {
            best = Some(row);
        }
    }
    best
}

/// Enrichment of every k-mer counted in both sets, highest first.
pub fn enrichments(test: &KmerCounter, ctrl: &KmerCounter, normalize: bool) -> Result<Vec<Enrichment>> {
    check_k(test, ctrl)?;
    Ok(ranked(ratios(test, ctrl, normalize)))
}

/// The most enriched k-mer; ties go to the lowest key. `None` when either
/// set is empty or no k-mer is counted in both.
pub fn top_enrichment(
    test: &KmerCounter,
    ctrl: &KmerCounter,
    normalize: bool,
) -> Result<Option<Enrichment>> {
    check_k(test, ctrl)?;
    Ok(best(ratios(test, ctrl, normalize)))
}

/// Iterative k-mer knockout.
///
/// Counts both files, then repeatedly reports the most enriched k-mer and
/// removes it from both tables, so the next round sees the enrichment left
/// once its windows are gone.
pub fn ikke(test_path: &Path, ctrl_path: &Path, options: &IkkeOptions) -> Result<Vec<Enrichment>> {
    let mut test = KmerCounter::count_path(test_path, options.count.clone())?;
    let mut ctrl = KmerCounter::count_path(ctrl_path, options.count.clone())?;

    let mut found = Vec::with_capacity(options.iterations);
    for round in 0..options.iterations {
        let Some(top) = top_enrichment(&test, &ctrl, options.normalize)? else {
            info!(round, "no k-mer left in both sets");
            break;
        };
        info!(round, kmer = %top.kmer, value = top.value, "top k-mer");
        if round + 1 < options.iterations {
            test.uncount_path(test_path, &top.kmer)?;
            ctrl.uncount_path(ctrl_path, &top.kmer)?;
        }
        found.push(top);
    }
    Ok(found)
}

/// Mono- and dinucleotide counts of the test set, standing in for a control.
///
/// The expected frequency of a k-mer is the product of the frequencies of
/// its `k - 1` dinucleotides divided by the frequencies of its `k - 2` inner
/// bases, i.e. a first-order Markov chain fitted to the test set itself.
#[derive(Debug)]
pub struct BackgroundModel {
    mono: KmerCounter,
    di: KmerCounter,
}

impl BackgroundModel {
    /// Count bases and dinucleotides of the file at `path` with the threads
    /// and buffers of `options`; its `k` is ignored.
    pub fn count_path(path: &Path, options: &CountOptions) -> Result<Self> {
        let mono = KmerCounter::count_path(path, CountOptions { k: 1, ..options.clone() })?;
        let di = KmerCounter::count_path(path, CountOptions { k: 2, ..options.clone() })?;
        Self::from_counters(mono, di)
    }

    /// A model from counters of k = 1 and k = 2.
    pub fn from_counters(mono: KmerCounter, di: KmerCounter) -> Result<Self> {
        if mono.k() != 1 {
            return Err(KatssError::KmerSizeMismatch(mono.k(), 1));
        }
        if di.k() != 2 {
            return Err(KatssError::KmerSizeMismatch(di.k(), 2));
        }
        Ok(BackgroundModel { mono, di })
    }

    pub fn mono(&self) -> &KmerCounter {
        &self.mono
    }

    pub fn di(&self) -> &KmerCounter {
        &self.di
    }

    /// Expected frequency of the k-mer `key`; 0 when any of its bases or
    /// dinucleotides was never seen.
    pub fn predict(&self, key: KmerKey, k: usize) -> f64 {
        let mono_total = self.mono.total() as f64;
        let di_total = self.di.total() as f64;
        if k < 2 || mono_total == 0.0 || di_total == 0.0 {
            return 0.0;
        }
        let di: f64 = (0..k - 1)
            .map(|i| self.di.get((key >> (2 * (k - 2 - i))) & 0xf) as f64 / di_total)
            .product();
        let mono: f64 = (1..k - 1)
            .map(|i| self.mono.get((key >> (2 * (k - 1 - i))) & 0x3) as f64 / mono_total)
            .product();
        if mono == 0.0 {
            0.0
        } else {
            di / mono
        }
    }

    /// Remove `motif` from both counters, reading the file at `path`.
    pub fn uncount_path(&mut self, path: &Path, motif: &str) -> Result<()> {
        self.mono.uncount_path(path, motif)?;
        self.di.uncount_path(path, motif)?;
        Ok(())
    }
}

fn check_model_k(k: usize) -> Result<()> {
    if k < 2 {
        return Err(KatssError::InvalidOption(
            "predicted enrichment needs k >= 2".into(),
        ));
    }
    Ok(())
}

/// Ratios of observed to predicted frequency in key order. Keys whose
/// prediction is 0 are skipped.
fn predicted_ratios(test: &KmerCounter, model: &BackgroundModel, normalize: bool) -> Vec<Enrichment> {
    let test_total = test.total() as f64;
    if test_total == 0.0 {
        return Vec::new();
    }
    let k = test.k();
    test.table()
        .nonzero_entries()
        .into_iter()
        .filter_map(|(key, t)| {
            let expected = model.predict(key, k);
            if expected == 0.0 {
                return None;
            }
            let r = (t as f64 / test_total) / expected;
            Some(Enrichment {
                key,
                kmer: test.spec().decode(key),
                value: if normalize { r.log2() } else { r },
            })
        })
        .collect()
}

/// Enrichment of every counted k-mer against its predicted frequency,
/// highest first.
pub fn model_enrichments(
    test: &KmerCounter,
    model: &BackgroundModel,
    normalize: bool,
) -> Result<Vec<Enrichment>> {
    check_model_k(test.k())?;
    Ok(ranked(predicted_ratios(test, model, normalize)))
}

/// The k-mer most enriched over its predicted frequency; ties go to the
/// lowest key.
pub fn top_model_enrichment(
    test: &KmerCounter,
    model: &BackgroundModel,
    normalize: bool,
) -> Result<Option<Enrichment>> {
    check_model_k(test.k())?;
    Ok(best(predicted_ratios(test, model, normalize)))
}

/// Enrichments of the file at `test_path` without a control set.
pub fn prob_enrichments(test_path: &Path, options: &CountOptions, normalize: bool) -> Result<Vec<Enrichment>> {
    check_model_k(options.k)?;
    let test = KmerCounter::count_path(test_path, options.clone())?;
    let model = BackgroundModel::count_path(test_path, options)?;
    model_enrichments(&test, &model, normalize)
}

/// [`ikke`] against the [`BackgroundModel`] of the test set. Each knocked-out
/// k-mer is removed from the test counts and from the model.
pub fn prob_ikke(test_path: &Path, options: &IkkeOptions) -> Result<Vec<Enrichment>> {
    check_model_k(options.count.k)?;
    let mut test = KmerCounter::count_path(test_path, options.count.clone())?;
    let mut model = BackgroundModel::count_path(test_path, &options.count)?;

    let mut found = Vec::with_capacity(options.iterations);
    for round in 0..options.iterations {
        let Some(top) = top_model_enrichment(&test, &model, options.normalize)? else {
            info!(round, "no k-mer left with a prediction");
            break;
        };
        info!(round, kmer = %top.kmer, value = top.value, "top k-mer");
        if round + 1 < options.iterations {
            test.uncount_path(test_path, &top.kmer)?;
            model.uncount_path(test_path, &top.kmer)?;
        }
        found.push(top);
    }
    Ok(found)
}
