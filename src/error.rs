use std::path::PathBuf;

/// Problems with the layout of a k-mer table file.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("incorrect prefix {found:#010x}, expected {expected:#010x}")]
    BadPrefix { found: u32, expected: u32 },
    #[error("table holds {in_header} samples but the name list has {in_names}")]
    SampleCountMismatch { in_header: u64, in_names: u64 },
    #[error("k-mer length in table is {in_header}, expected {expected}")]
    KmerLengthMismatch { in_header: u32, expected: u32 },
    #[error("table file is too small ({size} bytes)")]
    FileTooSmall { size: u64 },
    #[error("table body of {body} bytes is not a multiple of the {record_width}-byte record width")]
    TruncatedFile { body: u64, record_width: u64 },
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Format(#[from] FormatError),
    /// Entry `index` sorts before its predecessor.
    #[error("k-mer database {} is not sorted at entry {index}", .path.display())]
    UnsortedDatabase { path: PathBuf, index: usize },
    #[error("invalid base {base:?} in k-mer {kmer:?}")]
    InvalidBase { kmer: String, base: char },
    #[error("k-mer {kmer:?} has length {len}, at most {max} is supported")]
    KmerLength { kmer: String, len: usize, max: usize },
    #[error("thread count must be positive")]
    NoThreads,
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("failed to encode matrix: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("failed to decode matrix: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Attach a path to an `io::Error`.
pub(crate) trait IoContext<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
