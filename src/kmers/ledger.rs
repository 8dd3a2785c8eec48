use crate::kmers::motif_search::Motif;

/// Byte written over removed motifs. It is not a nucleotide, so every window
/// touching a masked region fails to encode.
pub const MASK_BYTE: u8 = b'X';

/// Motifs already removed from a count table, in removal order.
#[derive(Clone, Debug, Default)]
pub struct RemovalLedger {
    motifs: Vec<Motif>,
}

impl RemovalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, motif: Motif) {
        self.motifs.push(motif);
    }

    pub fn len(&self) -> usize {
        self.motifs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motifs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Motif> {
        self.motifs.iter()
    }

    pub fn contains(&self, motif: &Motif) -> bool {
        self.motifs.iter().any(|m| m == motif)
    }

    /// Overwrite every occurrence of every removed motif in `seq`.
    ///
    /// Motifs are applied in removal order. All occurrences of one motif,
    /// overlapping ones included, are located before any is overwritten, so
    /// the masked region is exactly the one its removal decremented.
    pub fn mask(&self, seq: &mut [u8]) {
        for motif in &self.motifs {
            for p in motif.find_all(seq) {
                seq[p..p + motif.len()].fill(MASK_BYTE);
            }
        }
    }
}
