//! Identity-by-state counting over a k-mer table.
//!
//! Every worker streams its own byte range of the table through a private
//! file handle and counts, for each pair of samples `i <= j`, the k-mers whose
//! presence bit agrees in both. The per-worker matrices are summed once all
//! workers have finished.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Seek, SeekFrom, Write},
    path::Path,
    time::Instant,
};

use byteorder::{LittleEndian as LE, ReadBytesExt};
use indicatif::ProgressBar;
use log::{debug, error, info};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{Result, error::IoContext, partition::Chunk, table::Table};

const BINCODE_CONFIG: bincode::config::Configuration<
    bincode::config::LittleEndian,
    bincode::config::Fixint,
> = bincode::config::standard().with_fixed_int_encoding();

/// Records between progress bar updates.
const PROGRESS_STEP: u64 = 1 << 14;

/// Square matrix of match counts between samples.
///
/// Scanning fills only the lower triangle, `get(j, i)` with `i <= j`.
/// The diagonal holds the number of scanned k-mers.
#[derive(bincode::Encode, bincode::Decode, Clone, Debug, Eq, PartialEq)]
pub struct IbsMatrix {
    n: usize,
    counts: Vec<u64>,
}

impl IbsMatrix {
    pub fn zeros(n: usize) -> Self {
        IbsMatrix {
            n,
            counts: vec![0; n * n],
        }
    }

    /// Wrap row-major counts of an `n x n` matrix.
    pub fn from_vec(n: usize, counts: Vec<u64>) -> Self {
        assert_eq!(counts.len(), n * n, "expected {n}x{n} counts");
        IbsMatrix { n, counts }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// The raw stored value at row `j`, column `i`.
    pub fn get(&self, j: usize, i: usize) -> u64 {
        self.counts[j * self.n + i]
    }

    /// Match count of a pair, in either order, read from the lower triangle.
    pub fn pair(&self, a: usize, b: usize) -> u64 {
        self.get(a.max(b), a.min(b))
    }

    pub fn row(&self, j: usize) -> &[u64] {
        &self.counts[j * self.n..(j + 1) * self.n]
    }

    /// Copy the lower triangle over the upper one.
    pub fn mirror(&mut self) {
        for j in 0..self.n {
            for i in 0..j {
                self.counts[i * self.n + j] = self.counts[j * self.n + i];
            }
        }
    }

    /// Element-wise sum.
    pub fn add(&mut self, other: &IbsMatrix) {
        assert_eq!(self.n, other.n, "matrices of different sizes");
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += *b;
        }
    }

    /// Count one record's presence pattern, one byte per sample.
    fn count_pattern(&mut self, pattern: &[u8]) {
        let n = self.n;
        debug_assert_eq!(pattern.len(), n);
        for (j, &bj) in pattern.iter().enumerate() {
            let row = &mut self.counts[j * n..j * n + j + 1];
            for (cell, &bi) in row.iter_mut().zip(&pattern[..=j]) {
                *cell += (bi == bj) as u64;
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut file = BufWriter::new(File::create(path).at(path)?);
        bincode::encode_into_std_write(self, &mut file, BINCODE_CONFIG)?;
        file.flush().at(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut file = BufReader::new(File::open(path).at(path)?);
        Ok(bincode::decode_from_std_read(&mut file, BINCODE_CONFIG)?)
    }
}

/// Count matching presence bits over the records of one chunk.
///
/// `words_per_record` is the number of presence words after the k-mer word.
pub fn scan_range(
    path: &Path,
    chunk: Chunk,
    words_per_record: usize,
    sample_count: usize,
    progress: &ProgressBar,
) -> Result<IbsMatrix> {
    let mut matrix = IbsMatrix::zeros(sample_count);
    if chunk.records == 0 {
        return Ok(matrix);
    }

    let mut file = File::open(path).at(path)?;
    file.seek(SeekFrom::Start(chunk.offset)).at(path)?;
    let mut reader = BufReader::with_capacity(1 << 20, file);

    let mut record = vec![0u64; 1 + words_per_record];
    let mut pattern = vec![0u8; sample_count];
    for r in 0..chunk.records {
        reader.read_u64_into::<LE>(&mut record).at(path)?;
        // The k-mer word itself is not needed.
        for (j, bit) in pattern.iter_mut().enumerate() {
            *bit = ((record[1 + (j >> 6)] >> (j & 63)) & 1) as u8;
        }
        matrix.count_pattern(&pattern);
        if (r + 1) % PROGRESS_STEP == 0 {
            progress.inc(PROGRESS_STEP);
        }
    }
    progress.inc(chunk.records % PROGRESS_STEP);
    Ok(matrix)
}

/// Sum partial matrices of side `n`.
pub fn reduce(n: usize, partials: impl IntoIterator<Item = IbsMatrix>) -> IbsMatrix {
    partials.into_iter().fold(IbsMatrix::zeros(n), |mut acc, m| {
        acc.add(&m);
        acc
    })
}

/// Scan `table` with a fresh pool of `threads` workers and reduce the results.
///
/// All workers run to completion. If any of them failed, the first failure is
/// returned and no matrix is produced.
pub fn compute_matrix(table: &Table, threads: usize, progress: &ProgressBar) -> Result<IbsMatrix> {
    let layout = table.layout;
    let chunks = layout.partition(threads)?;
    for (t, chunk) in chunks.iter().enumerate() {
        debug!(
            "Thread {t}: {} records from byte {}",
            chunk.records, chunk.offset
        );
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()?;
    progress.set_length(layout.record_count);

    let start = Instant::now();
    let path = &table.path;
    let partials: Vec<Result<IbsMatrix>> = pool.install(|| {
        chunks
            .par_iter()
            .map(|&chunk| {
                scan_range(
                    path,
                    chunk,
                    layout.words_per_record,
                    layout.sample_count,
                    progress,
                )
            })
            .collect()
    });
    let t_scan = start.elapsed();
    info!(
        "Scanning {} records on {threads} threads took {t_scan:?}",
        layout.record_count
    );

    let mut first_err = None;
    let mut done = Vec::with_capacity(partials.len());
    for (t, partial) in partials.into_iter().enumerate() {
        match partial {
            Ok(m) => done.push(m),
            Err(e) => {
                error!("Thread {t} failed: {e}");
                first_err.get_or_insert(e);
            }
        }
    }
    if let Some(e) = first_err {
        return Err(e);
    }
    Ok(reduce(layout.sample_count, done))
}
