//! Splitting table records into contiguous per-thread byte ranges.

use crate::{Error, Result, table::HEADER_SIZE};

/// A contiguous run of records owned by one worker.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Chunk {
    /// Byte offset of the first record in the table file.
    pub offset: u64,
    pub records: u64,
}

/// Give every thread `record_count / threads` records and the last thread the rest.
///
/// This is not load balanced: the last chunk can be up to `threads - 1`
/// records larger than the others.
pub fn partition(record_count: u64, record_width: u64, threads: usize) -> Result<Vec<Chunk>> {
    if threads == 0 {
        return Err(Error::NoThreads);
    }
    let threads = threads as u64;
    let per_thread = record_count / threads;
    let last = record_count - per_thread * (threads - 1);

    let mut offset = HEADER_SIZE;
    let chunks = (0..threads)
        .map(|t| {
            let records = if t + 1 == threads { last } else { per_thread };
            let chunk = Chunk { offset, records };
            offset += records * record_width;
            chunk
        })
        .collect();
    Ok(chunks)
}
