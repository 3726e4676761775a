//! 2-bit k-mer packing, reverse complements and canonical forms.
//!
//! A k-mer of length `k <= 31` is stored in the low `2k` bits of a `u64`,
//! first base in the most significant pair, with `A=0, C=1, G=2, T=3`.
//! The top two bits of a stored value are a strand tag: [`FLAG_SELF`] when
//! the k-mer was already canonical, [`FLAG_RC`] when its reverse complement
//! was stored instead.

use crate::{Error, Result};

/// Longest k-mer that leaves room for the strand tag.
pub const MAX_K: usize = 31;
/// The low 62 bits of a tagged value hold the canonical k-mer.
pub const KMER_MASK: u64 = 0x3FFF_FFFF_FFFF_FFFF;
/// Tag of a k-mer stored in its own orientation.
pub const FLAG_SELF: u64 = 0x4000_0000_0000_0000;
/// Tag of a k-mer stored as its reverse complement.
pub const FLAG_RC: u64 = 0x8000_0000_0000_0000;

/// Which orientation of a k-mer was kept as canonical.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn flag(self) -> u64 {
        match self {
            Strand::Forward => FLAG_SELF,
            Strand::Reverse => FLAG_RC,
        }
    }

    /// Decode the 2-bit tag of a stored value, `None` for `00` and `11`.
    pub fn from_tag(tag: u64) -> Option<Self> {
        match tag & 0b11 {
            0b01 => Some(Strand::Forward),
            0b10 => Some(Strand::Reverse),
            _ => None,
        }
    }
}

/// Reverse complement of the `k` bases in the low `2k` bits of `kmer`.
///
/// Bits above `2k` are ignored and zero in the result.
#[inline]
pub fn revcomp(kmer: u64, k: usize) -> u64 {
    debug_assert!(k <= 32);
    let mut rc = 0u64;
    let mut val = kmer;
    for _ in 0..k {
        rc = (rc << 2) | ((val & 0b11) ^ 0b11);
        val >>= 2;
    }
    rc
}

/// Canonical form of `kmer` and the tag recording which orientation won.
///
/// Returns `(kmer, FLAG_SELF)` when `kmer <= revcomp(kmer)`, so palindromes
/// keep their own orientation, and `(revcomp(kmer), FLAG_RC)` otherwise.
#[inline]
pub fn canonicalize(kmer: u64, k: usize) -> (u64, u64) {
    debug_assert!(k <= MAX_K);
    let fwd = kmer & KMER_MASK;
    let rc = revcomp(fwd, k);
    if fwd <= rc {
        (fwd, FLAG_SELF)
    } else {
        (rc, FLAG_RC)
    }
}

/// Canonicalize and pack into the on-disk `flag | canonical` form.
#[inline]
pub fn tagged(kmer: u64, k: usize) -> u64 {
    let (canonical, flag) = canonicalize(kmer, k);
    canonical | flag
}

/// Split a stored value into its canonical k-mer and its 2-bit tag.
#[inline]
pub fn untag(value: u64) -> (u64, u64) {
    (value & KMER_MASK, value >> 62)
}

const fn base_code(b: u8) -> Option<u64> {
    match b {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None,
    }
}

/// Pack a DNA string of at most [`MAX_K`] bases.
pub fn encode_kmer(seq: &str) -> Result<u64> {
    if seq.len() > MAX_K {
        return Err(Error::KmerLength {
            kmer: seq.to_string(),
            len: seq.len(),
            max: MAX_K,
        });
    }
    seq.bytes().try_fold(0u64, |acc, b| match base_code(b) {
        Some(code) => Ok((acc << 2) | code),
        None => Err(Error::InvalidBase {
            kmer: seq.to_string(),
            base: b as char,
        }),
    })
}

/// Unpack the low `2k` bits of `kmer` into an uppercase DNA string.
pub fn decode_kmer(kmer: u64, k: usize) -> String {
    (0..k)
        .rev()
        .map(|i| b"ACGT"[((kmer >> (2 * i)) & 0b11) as usize] as char)
        .collect()
}
