//! Binary k-mer presence/absence tables.
//!
//! A table `<prefix>.table` starts with a 16-byte little-endian header:
//!
//! ```text
//! offset 0:  u32 prefix = 0xDDCCBBAA
//! offset 4:  u64 sample_count
//! offset 12: u32 kmer_length
//! ```
//!
//! followed by fixed-width records: one tagged `u64` k-mer and then
//! `ceil(sample_count / 64)` words of presence bits, sample `i` at bit `i & 63`
//! of word `i >> 6`. Sample names live in `<prefix>.names`, one per line.

use std::{
    ffi::OsString,
    fs::File,
    io::{BufRead, BufReader, Read},
    path::{Path, PathBuf},
};

use byteorder::{LittleEndian as LE, ReadBytesExt};
use log::info;

use crate::{
    Error, FormatError, Result,
    error::IoContext,
    partition::{Chunk, partition},
};

pub const TABLE_PREFIX: u32 = 0xDDCC_BBAA;
pub const HEADER_SIZE: u64 = 4 + 8 + 4;
/// Bits per presence word.
pub const WORD_BITS: u64 = 64;

pub const NAMES_EXTENSION: &str = "names";
pub const TABLE_EXTENSION: &str = "table";

/// `<prefix>.<ext>`, keeping any dots already in the prefix.
pub fn with_extension(prefix: &Path, ext: &str) -> PathBuf {
    let mut s = OsString::from(prefix.as_os_str());
    s.push(".");
    s.push(ext);
    s.into()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TableHeader {
    pub prefix: u32,
    pub sample_count: u64,
    pub kmer_length: u32,
}

impl TableHeader {
    pub fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self> {
        Ok(TableHeader {
            prefix: r.read_u32::<LE>()?,
            sample_count: r.read_u64::<LE>()?,
            kmer_length: r.read_u32::<LE>()?,
        })
    }

    /// Check the header against the name list and the expected k-mer length.
    pub fn validate(&self, sample_count: usize, k: usize) -> std::result::Result<(), FormatError> {
        if self.prefix != TABLE_PREFIX {
            return Err(FormatError::BadPrefix {
                found: self.prefix,
                expected: TABLE_PREFIX,
            });
        }
        if self.sample_count != sample_count as u64 {
            return Err(FormatError::SampleCountMismatch {
                in_header: self.sample_count,
                in_names: sample_count as u64,
            });
        }
        if self.kmer_length as u64 != k as u64 {
            return Err(FormatError::KmerLengthMismatch {
                in_header: self.kmer_length,
                expected: k as u32,
            });
        }
        Ok(())
    }
}

/// Record geometry of a validated table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TableLayout {
    pub sample_count: usize,
    /// Presence words following the k-mer word in each record.
    pub words_per_record: usize,
    /// Bytes per record, `8 * (1 + words_per_record)`.
    pub record_width: u64,
    pub record_count: u64,
}

impl TableLayout {
    pub fn new(file_size: u64, sample_count: usize) -> std::result::Result<Self, FormatError> {
        if file_size <= HEADER_SIZE {
            return Err(FormatError::FileTooSmall { size: file_size });
        }
        let words_per_record = (sample_count as u64).div_ceil(WORD_BITS) as usize;
        let record_width = 8 * (1 + words_per_record as u64);
        let body = file_size - HEADER_SIZE;
        if body % record_width != 0 {
            return Err(FormatError::TruncatedFile { body, record_width });
        }
        Ok(TableLayout {
            sample_count,
            words_per_record,
            record_width,
            record_count: body / record_width,
        })
    }

    /// Split the records over `threads` workers.
    pub fn partition(&self, threads: usize) -> Result<Vec<Chunk>> {
        partition(self.record_count, self.record_width, threads)
    }
}

/// Read the sample names, one per line.
pub fn load_names(path: &Path) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(path).at(path)?);
    let mut names = vec![];
    for line in reader.lines() {
        let line = line.at(path)?;
        names.push(line.trim().to_string());
    }
    while names.last().is_some_and(|n| n.is_empty()) {
        names.pop();
    }
    Ok(names)
}

/// An opened and validated k-mer table.
#[derive(Debug)]
pub struct Table {
    pub path: PathBuf,
    pub names: Vec<String>,
    pub header: TableHeader,
    pub layout: TableLayout,
}

impl Table {
    /// Open `<prefix>.names` and `<prefix>.table`, checking the header and size.
    pub fn open(prefix: &Path, k: usize) -> Result<Self> {
        let names_path = with_extension(prefix, NAMES_EXTENSION);
        let table_path = with_extension(prefix, TABLE_EXTENSION);
        for path in [&names_path, &table_path] {
            if !path.is_file() {
                return Err(Error::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "couldn't find file",
                    ),
                });
            }
        }

        let names = load_names(&names_path)?;
        let mut file = File::open(&table_path).at(&table_path)?;
        let file_size = file.metadata().at(&table_path)?.len();
        if file_size <= HEADER_SIZE {
            return Err(FormatError::FileTooSmall { size: file_size }.into());
        }
        let header = TableHeader::read_from(&mut file).at(&table_path)?;
        header.validate(names.len(), k)?;
        let layout = TableLayout::new(file_size, names.len())?;
        info!(
            "Table {} has {} samples and {} k-mers",
            table_path.display(),
            layout.sample_count,
            layout.record_count
        );

        Ok(Table {
            path: table_path,
            names,
            header,
            layout,
        })
    }
}
