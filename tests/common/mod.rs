//! Synthetic tables and databases for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use kmer_ibs::{IbsMatrix, table::TABLE_PREFIX};

/// Presence rows, one `Vec<bool>` of length `samples` per k-mer.
pub type Rows = Vec<Vec<bool>>;

pub fn random_rows(records: usize, samples: usize) -> Rows {
    (0..records)
        .map(|_| (0..samples).map(|_| rand::random::<bool>()).collect())
        .collect()
}

pub fn table_bytes(rows: &Rows, samples: usize, k: u32) -> Vec<u8> {
    let words = samples.div_ceil(64);
    let mut out = vec![];
    out.extend_from_slice(&TABLE_PREFIX.to_le_bytes());
    out.extend_from_slice(&(samples as u64).to_le_bytes());
    out.extend_from_slice(&k.to_le_bytes());
    for row in rows {
        out.extend_from_slice(&rand::random::<u64>().to_le_bytes());
        let mut bits = vec![0u64; words];
        for (j, &b) in row.iter().enumerate() {
            bits[j >> 6] |= (b as u64) << (j & 63);
        }
        for w in bits {
            out.extend_from_slice(&w.to_le_bytes());
        }
    }
    out
}

/// Write `<dir>/<name>.names` and `<dir>/<name>.table`, returning the prefix.
pub fn write_table(dir: &Path, name: &str, rows: &Rows, samples: usize) -> PathBuf {
    let prefix = dir.join(name);
    let names = (0..samples).map(|i| format!("sample{i}\n")).collect::<String>();
    std::fs::write(dir.join(format!("{name}.names")), names).unwrap();
    std::fs::write(
        dir.join(format!("{name}.table")),
        table_bytes(rows, samples, 31),
    )
    .unwrap();
    prefix
}

/// Reference counts straight from the definition, lower triangle only.
pub fn naive(rows: &Rows, samples: usize) -> IbsMatrix {
    let mut counts = vec![0u64; samples * samples];
    for row in rows {
        for j in 0..samples {
            for i in 0..=j {
                counts[j * samples + i] += (row[i] == row[j]) as u64;
            }
        }
    }
    IbsMatrix::from_vec(samples, counts)
}

pub fn write_db(path: &Path, values: &[u64]) {
    let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<_>>();
    std::fs::write(path, bytes).unwrap();
}
