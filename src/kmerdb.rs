//! Membership indexes over flat k-mer database files.
//!
//! A database file is a headerless sequence of little-endian `u64` values,
//! each `flag << 62 | canonical_kmer` as produced by [`crate::bits::tagged`].
//! Queries are canonicalized first, so a k-mer and its reverse complement
//! hit the same entry.

use std::{collections::HashMap, path::Path};

use byteorder::{ByteOrder, LittleEndian as LE};
use itertools::Itertools;
use log::info;

use crate::{
    Error, Result,
    bits::{KMER_MASK, Strand, canonicalize, untag},
    error::IoContext,
};

/// Read every complete 8-byte value of a database file, in file order.
///
/// A trailing partial value is ignored.
pub fn read_db(path: &Path) -> Result<Vec<u64>> {
    let bytes = std::fs::read(path).at(path)?;
    let values = bytes.chunks_exact(8).map(LE::read_u64).collect_vec();
    info!("Read {} k-mers from {}", values.len(), path.display());
    Ok(values)
}

/// Hash map from canonical k-mer to its stored strand tag.
#[derive(Clone, Debug, Default)]
pub struct HashIndex {
    kmers: HashMap<u64, u64>,
}

impl HashIndex {
    pub fn build(path: &Path) -> Result<Self> {
        let index = Self::from_values(read_db(path)?);
        info!("total kmers: {}", index.len());
        Ok(index)
    }

    /// Later duplicates overwrite the tag of earlier ones.
    pub fn from_values(values: impl IntoIterator<Item = u64>) -> Self {
        let mut kmers = HashMap::new();
        for v in values {
            let (canonical, tag) = untag(v);
            kmers.insert(canonical, tag);
        }
        HashIndex { kmers }
    }

    pub fn len(&self) -> usize {
        self.kmers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kmers.is_empty()
    }

    /// True when `kmer` or its reverse complement is in the database.
    ///
    /// The stored strand is not compared; see [`HashIndex::contains_same_strand`].
    pub fn contains(&self, kmer: u64, k: usize) -> bool {
        let (canonical, _) = canonicalize(kmer, k);
        self.kmers.contains_key(&canonical)
    }

    /// True when the database entry was stored with the same orientation as the query.
    pub fn contains_same_strand(&self, kmer: u64, k: usize) -> bool {
        let (canonical, flag) = canonicalize(kmer, k);
        self.kmers.get(&canonical) == Some(&(flag >> 62))
    }

    /// Orientation the canonical form of `kmer` was stored with.
    pub fn strand(&self, kmer: u64, k: usize) -> Option<Strand> {
        let (canonical, _) = canonicalize(kmer, k);
        self.kmers.get(&canonical).copied().and_then(Strand::from_tag)
    }
}

/// Position of the first value smaller than its predecessor, comparing masked k-mers.
fn first_unsorted(values: &[u64]) -> Option<usize> {
    values
        .iter()
        .tuple_windows()
        .position(|(a, b)| a & KMER_MASK > b & KMER_MASK)
        .map(|i| i + 1)
}

/// Tagged values sorted by canonical k-mer, queried by binary search.
///
/// Duplicates are allowed.
#[derive(Clone, Debug, Default)]
pub struct SortedIndex {
    kmers: Vec<u64>,
}

impl SortedIndex {
    /// Load a database that must already be sorted by canonical k-mer.
    pub fn build(path: &Path) -> Result<Self> {
        let kmers = read_db(path)?;
        if let Some(index) = first_unsorted(&kmers) {
            return Err(Error::UnsortedDatabase {
                path: path.to_path_buf(),
                index,
            });
        }
        info!("total kmers: {}", kmers.len());
        Ok(SortedIndex { kmers })
    }

    /// Load a database in any order, sorting it in memory.
    pub fn build_sorted(path: &Path) -> Result<Self> {
        let index = Self::from_values(read_db(path)?);
        info!("total kmers: {}", index.len());
        Ok(index)
    }

    pub fn from_values(mut kmers: Vec<u64>) -> Self {
        kmers.sort_unstable_by_key(|v| v & KMER_MASK);
        SortedIndex { kmers }
    }

    pub fn len(&self) -> usize {
        self.kmers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kmers.is_empty()
    }

    /// True when `kmer` or its reverse complement is in the database.
    pub fn contains(&self, kmer: u64, k: usize) -> bool {
        let (canonical, _) = canonicalize(kmer, k);
        self.kmers
            .binary_search_by(|v| (v & KMER_MASK).cmp(&canonical))
            .is_ok()
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Eq, PartialEq)]
pub enum IndexKind {
    Hash,
    Vector,
}

impl IndexKind {
    /// Load `path` into the chosen index.
    ///
    /// With `sort`, an unsorted vector database is sorted instead of rejected.
    pub fn build(self, path: &Path, sort: bool) -> Result<KmerDb> {
        Ok(match (self, sort) {
            (IndexKind::Hash, _) => KmerDb::Hash(HashIndex::build(path)?),
            (IndexKind::Vector, false) => KmerDb::Vector(SortedIndex::build(path)?),
            (IndexKind::Vector, true) => KmerDb::Vector(SortedIndex::build_sorted(path)?),
        })
    }
}

#[derive(Clone, Debug)]
pub enum KmerDb {
    Hash(HashIndex),
    Vector(SortedIndex),
}

impl KmerDb {
    pub fn contains(&self, kmer: u64, k: usize) -> bool {
        match self {
            KmerDb::Hash(index) => index.contains(kmer, k),
            KmerDb::Vector(index) => index.contains(kmer, k),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            KmerDb::Hash(index) => index.len(),
            KmerDb::Vector(index) => index.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
