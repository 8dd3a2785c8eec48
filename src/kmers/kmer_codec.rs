use crate::error::{KatssError, Result};

/// Integer key of a k-mer: base-4 digits, most significant position first.
pub type KmerKey = u32;

/// Largest supported window length (4^16 keys fit in a `u32`).
pub const MAX_K: usize = 16;

/// Digit returned by [`encode_base`] for `\n` and `\r`.
pub const LINE_BREAK: u8 = 5;
/// Digit returned by [`encode_base`] for anything outside ACGTU.
pub const INVALID: u8 = 4;

pub const BASES_T: [char; 4] = ['A', 'C', 'G', 'T'];
pub const BASES_U: [char; 4] = ['A', 'C', 'G', 'U'];

/// Encoder/decoder for one window length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KmerSpec {
    /// Window length
    pub k: usize,
    /// Render base 3 as `T` (true) or `U` (false) when decoding
    pub use_t: bool,
}

impl KmerSpec {
    /// Key of the window starting at `offset`, or `None` if it cannot be encoded.
    #[inline]
    pub fn encode(&self, text: &[u8], offset: usize) -> Option<KmerKey> {
        encode(text, offset, self.k)
    }

    pub fn decode(&self, key: KmerKey) -> String {
        decode(key, self.k, self.use_t)
    }

    /// Size of the key space, 4^k.
    pub fn num_keys(&self) -> u64 {
        num_keys(self.k)
    }

    /// Rolling scan over every window of one record.
    pub fn scan<'a>(&self, record: &'a [u8]) -> KmerScanner<'a> {
        KmerScanner::new(record, self.k)
    }
}

/// Validate `k` and build its spec. Keys decode with `T` by default.
pub fn build_kmer_spec(k: usize) -> Result<KmerSpec> {
    if k < 1 || k > MAX_K {
        return Err(KatssError::InvalidKmerSize(k));
    }
    Ok(KmerSpec { k, use_t: true })
}

#[inline]
pub fn num_keys(k: usize) -> u64 {
    1u64 << (2 * k)
}

/// Static ASCII→radix-4 lookup table.
/// 0 = A, 1 = C, 2 = G, 3 = T/U, 4 = other, 5 = line break
static LUT: [u8; 256] = {
    let mut t = [INVALID; 256];
    t[b'A' as usize] = 0;
    t[b'a' as usize] = 0;
    t[b'C' as usize] = 1;
    t[b'c' as usize] = 1;
    t[b'G' as usize] = 2;
    t[b'g' as usize] = 2;
    t[b'T' as usize] = 3;
    t[b't' as usize] = 3;
    t[b'U' as usize] = 3;
    t[b'u' as usize] = 3;
    t[b'\n' as usize] = LINE_BREAK;
    t[b'\r' as usize] = LINE_BREAK;
    t
};

/// Encode a single nucleotide into its base-4 digit.
///
/// - A or a → 0
/// - C or c → 1
/// - G or g → 2
/// - T, t, U or u → 3
/// - `\n` or `\r` → [`LINE_BREAK`]
/// - anything else → [`INVALID`]
#[inline(always)]
pub fn encode_base(b: u8) -> u8 {
    LUT[b as usize]
}

#[inline]
pub fn is_nucleotide(b: u8) -> bool {
    encode_base(b) < 4
}

/// Encode the `k` alphabet characters starting at `offset`.
///
/// Line breaks are skipped without consuming a position. Returns `None` when
/// a non-ACGTU character is met or the text ends before `k` bases were read.
pub fn encode(text: &[u8], offset: usize, k: usize) -> Option<KmerKey> {
    let mut key: u64 = 0;
    let mut taken = 0;
    for &b in text.get(offset..)? {
        if taken == k {
            break;
        }
        match encode_base(b) {
            LINE_BREAK => continue,
            INVALID => return None,
            v => {
                key = (key << 2) | v as u64;
                taken += 1;
            }
        }
    }
    if taken < k {
        return None;
    }
    Some(key as KmerKey)
}

/// Decode a key to its k-mer string. Exact inverse of [`encode`].
pub fn decode(key: KmerKey, k: usize, use_t: bool) -> String {
    let bases = if use_t { &BASES_T } else { &BASES_U };
    let mut tmp = key as u64;
    let mut buf = vec!['A'; k];
    for pos in (0..k).rev() {
        buf[pos] = bases[(tmp & 3) as usize];
        tmp >>= 2;
    }
    buf.into_iter().collect()
}

/// Every motif of the key space, in key order.
pub fn all_motifs(spec: &KmerSpec) -> Vec<String> {
    (0..spec.num_keys())
        .map(|c| spec.decode(c as KmerKey))
        .collect()
}

/// Rolling encoder over one record.
///
/// Yields the key of every encodable window in start-position order. The
/// result is the same as calling [`encode`] at every start position and
/// keeping the hits, without re-reading each window.
pub struct KmerScanner<'a> {
    seq: &'a [u8],
    pos: usize,
    k: usize,
    mask: u64,
    code: u64,
    // valid bases ending at the current position
    run: usize,
    // bases (valid or not) consumed so far, line breaks excluded
    bases: usize,
}

impl<'a> KmerScanner<'a> {
    pub fn new(seq: &'a [u8], k: usize) -> Self {
        KmerScanner {
            seq,
            pos: 0,
            k,
            mask: num_keys(k) - 1,
            code: 0,
            run: 0,
            bases: 0,
        }
    }

    /// Window start positions passed so far, encodable or not.
    pub fn windows_seen(&self) -> usize {
        self.bases.saturating_sub(self.k - 1)
    }
}

impl Iterator for KmerScanner<'_> {
    type Item = KmerKey;

    #[inline]
    fn next(&mut self) -> Option<KmerKey> {
        while self.pos < self.seq.len() {
            let b = self.seq[self.pos];
            self.pos += 1;
            match encode_base(b) {
                LINE_BREAK => {}
                INVALID => {
                    self.run = 0;
                    self.bases += 1;
                }
                v => {
                    self.code = ((self.code << 2) | v as u64) & self.mask;
                    self.run += 1;
                    self.bases += 1;
                    if self.run >= self.k {
                        return Some(self.code as KmerKey);
                    }
                }
            }
        }
        None
    }
}
