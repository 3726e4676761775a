//! # kmer-ibs
//!
//! Pairwise identity-by-state (IBS) between samples, computed from a binary
//! k-mer presence/absence table, plus membership indexes over canonical k-mer
//! databases.
//!
//! ## K-mers
//! K-mers of length `k <= 31` are packed 2 bits per base (`A=0, C=1, G=2, T=3`)
//! into the low `2k` bits of a `u64`, first base most significant.
//! The canonical form is the smaller of a k-mer and its reverse complement;
//! palindromes keep their own orientation. Stored k-mers carry a 2-bit strand
//! tag in their top bits, see [`bits`].
//!
//! ## Tables
//! A table is a pair of files `<prefix>.names` (one sample per line) and
//! `<prefix>.table`: a 16-byte header followed by one fixed-width record per
//! k-mer holding the tagged k-mer and one presence bit per sample. See [`table`].
//!
//! ## IBS matrix
//! For each pair of samples we count the k-mers where both have the same
//! presence bit, either both present or both absent. The diagonal therefore
//! holds the number of k-mers in the table.
//!
//! The table is split into one contiguous range of records per thread.
//! Every thread counts its range into a private matrix through its own file
//! handle, and the partial matrices are summed after all threads have joined.
//! Counting is `O(n * s^2 / 2)` for `n` k-mers and `s` samples, which dominates
//! everything else. A thread that fails to read its range fails the whole
//! computation.
//!
//! Only the lower triangle is computed. [`output::MatrixLayout::Full`] mirrors
//! it when writing.
//!
//! ## Lookups
//! A flat database of tagged canonical k-mers can be loaded into a hash map
//! ([`HashIndex`]) or a sorted vector ([`SortedIndex`]). Both canonicalize the
//! query, so a k-mer and its reverse complement are found alike.
//! The sorted vector must be built from a file sorted by canonical k-mer;
//! [`SortedIndex::build`] checks this, [`SortedIndex::build_sorted`] sorts instead.
//!
//! ```
//! use kmer_ibs::bits::{canonicalize, encode_kmer, revcomp, FLAG_RC};
//!
//! let kmer = encode_kmer("TTTGCA").unwrap();
//! let rc = revcomp(kmer, 6);
//! assert_eq!(kmer_ibs::bits::decode_kmer(rc, 6), "TGCAAA");
//! assert_eq!(canonicalize(kmer, 6), (rc, FLAG_RC));
//!
//! let db = kmer_ibs::HashIndex::from_values([kmer_ibs::bits::tagged(kmer, 6)]);
//! assert!(db.contains(kmer, 6));
//! assert!(db.contains(rc, 6));
//! ```

pub mod bits;
mod error;
pub mod ibs;
pub mod kmerdb;
pub mod output;
pub mod partition;
pub mod table;

use indicatif::ProgressBar;

pub use error::{Error, FormatError, Result};
pub use ibs::IbsMatrix;
pub use kmerdb::{HashIndex, IndexKind, KmerDb, SortedIndex};
pub use table::Table;

fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

#[derive(clap::Args, Copy, Clone, Debug, Eq, PartialEq)]
pub struct IbsParams {
    /// Number of worker threads, each scanning its own range of the table.
    #[arg(
        short = 'p',
        long,
        default_value_t = default_threads(),
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..),
    )]
    pub threads: usize,
    /// k-mer length recorded in the table header.
    #[arg(short, default_value_t = 31)]
    pub k: usize,
}

impl IbsParams {
    pub fn new(threads: usize) -> Self {
        IbsParams { threads, k: 31 }
    }

    /// Open `<prefix>.names` and `<prefix>.table` and validate them against `k`.
    pub fn open(&self, prefix: &std::path::Path) -> Result<Table> {
        Table::open(prefix, self.k)
    }

    /// Compute the IBS matrix of an opened table.
    pub fn compute(&self, table: &Table, progress: &ProgressBar) -> Result<IbsMatrix> {
        ibs::compute_matrix(table, self.threads, progress)
    }
}
