use crate::error::{KatssError, Result};

/// Uppercase, with `U` folded onto `T`.
#[inline]
pub fn fold_nt(b: u8) -> u8 {
    match b.to_ascii_uppercase() {
        b'U' => b'T',
        c => c,
    }
}

/// A motif to search for, case-insensitively and with `U` matching `T`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Motif {
    text: String,
    folded: Vec<u8>,
}

impl Motif {
    pub fn new(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(KatssError::EmptyMotif);
        }
        Ok(Motif {
            text: text.to_string(),
            folded: text.bytes().map(fold_nt).collect(),
        })
    }

    /// The motif as given.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.folded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folded.is_empty()
    }

    /// First occurrence starting at or after `from`.
    pub fn find(&self, seq: &[u8], from: usize) -> Option<usize> {
        let m = self.folded.len();
        if m == 0 || from >= seq.len() || seq.len() - from < m {
            return None;
        }
        let first = self.folded[0];
        (from..=seq.len() - m).find(|&i| {
            fold_nt(seq[i]) == first
                && seq[i + 1..i + m]
                    .iter()
                    .zip(&self.folded[1..])
                    .all(|(&a, &b)| fold_nt(a) == b)
        })
    }

    /// Start positions of every occurrence, overlapping ones included.
    pub fn find_all(&self, seq: &[u8]) -> Vec<usize> {
        let mut hits = Vec::new();
        let mut from = 0;
        while let Some(p) = self.find(seq, from) {
            hits.push(p);
            from = p + 1;
        }
        hits
    }
}

impl std::fmt::Display for Motif {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
