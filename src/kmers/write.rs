use crate::cli::BigCount;
use crate::kmers::count_table::CountTable;
use crate::kmers::enrichment::Enrichment;
use crate::kmers::kmer_codec::{KmerKey, KmerSpec};
use crate::kmers::prob_table::ProbabilityTable;
use anyhow::Context;
use ndarray::Array1;
use ndarray_npy::write_npy;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Largest k for which every motif is written, zeros included.
pub const ALL_MOTIFS_MAX_K: usize = 6;

/// Write `k<k>_counts.npy` and `k<k>_motifs.txt` to `out_dir`.
///
/// Line `i` of the motif list names element `i` of the count vector. Up to
/// k = 6 every motif is listed in key order; above that only the nonzero ones.
pub fn write_count_table(table: &CountTable, spec: &KmerSpec, out_dir: &Path) -> anyhow::Result<()> {
    let (keys, counts): (Vec<KmerKey>, Vec<BigCount>) = if spec.k <= ALL_MOTIFS_MAX_K {
        (0..spec.num_keys())
            .map(|key| {
                let key = key as KmerKey;
                (key, table.get(key))
            })
            .unzip()
    } else {
        table.nonzero_entries().into_iter().unzip()
    };

    let prefix = format!("k{}", spec.k);
    let npy_path = out_dir.join(format!("{}_counts.npy", prefix));
    write_npy(&npy_path, &Array1::from(counts))
        .with_context(|| format!("writing {}", npy_path.display()))?;

    let motifs_path = out_dir.join(format!("{}_motifs.txt", prefix));
    let mut f = BufWriter::new(
        File::create(&motifs_path).with_context(|| format!("creating {}", motifs_path.display()))?,
    );
    for key in keys {
        writeln!(f, "{}", spec.decode(key))?;
    }
    f.flush()?;
    Ok(())
}

/// One `kmer<TAB>value` line per row.
pub fn write_enrichments(path: &Path, rows: &[Enrichment]) -> anyhow::Result<()> {
    let mut f = BufWriter::new(
        File::create(path).with_context(|| format!("creating {}", path.display()))?,
    );
    writeln!(f, "kmer\tenrichment")?;
    for row in rows {
        writeln!(f, "{}\t{:.6}", row.kmer, row.value)?;
    }
    f.flush()?;
    Ok(())
}

/// One line per k-mer: the k-mer, its `k` positional values and the
/// occurrence counter.
pub fn write_probability_table(
    path: &Path,
    table: &ProbabilityTable,
    spec: &KmerSpec,
) -> anyhow::Result<()> {
    let mut f = BufWriter::new(
        File::create(path).with_context(|| format!("creating {}", path.display()))?,
    );
    write!(f, "kmer")?;
    for i in 0..spec.k {
        write!(f, "\tpos{}", i + 1)?;
    }
    writeln!(f, "\toccurrences")?;
    for (key, row) in table.entries() {
        write!(f, "{}", spec.decode(key))?;
        for v in &row[..spec.k] {
            write!(f, "\t{:.6}", v)?;
        }
        writeln!(f, "\t{}", row[spec.k])?;
    }
    f.flush()?;
    Ok(())
}
