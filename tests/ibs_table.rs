mod common;

use indicatif::ProgressBar;
use kmer_ibs::{
    Error, FormatError, IbsParams,
    table::{HEADER_SIZE, TABLE_PREFIX},
};

use common::{naive, random_rows, table_bytes, write_table};

#[test]
fn thread_counts_agree() {
    let dir = tempfile::tempdir().unwrap();
    for samples in [1, 4, 64, 70] {
        let records = rand::random_range(1..300);
        let rows = random_rows(records, samples);
        let prefix = write_table(dir.path(), &format!("t{samples}"), &rows, samples);
        let expected = naive(&rows, samples);

        for threads in [1, 2, 3, 8, records + 5] {
            let params = IbsParams::new(threads);
            let table = params.open(&prefix).unwrap();
            assert_eq!(table.layout.record_count, records as u64);
            assert_eq!(table.names.len(), samples);
            let m = params.compute(&table, &ProgressBar::hidden()).unwrap();
            assert_eq!(m, expected, "samples={samples} threads={threads}");
            for j in 0..samples {
                assert_eq!(m.get(j, j), records as u64);
            }
        }
    }
}

#[test]
fn four_samples_one_kmer() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = write_table(dir.path(), "t", &vec![vec![true, true, false, false]], 4);
    let params = IbsParams::new(2);
    let table = params.open(&prefix).unwrap();
    let m = params.compute(&table, &ProgressBar::hidden()).unwrap();
    assert_eq!(m.get(0, 0), 1);
    assert_eq!(m.get(1, 1), 1);
    assert_eq!(m.pair(0, 1), 1);
    assert_eq!(m.pair(2, 3), 1);
    assert_eq!(m.pair(0, 2), 0);
    assert_eq!(m.pair(1, 3), 0);
}

#[test]
fn missing_names_file() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = write_table(dir.path(), "t", &random_rows(3, 2), 2);
    std::fs::remove_file(dir.path().join("t.names")).unwrap();
    match IbsParams::new(1).open(&prefix) {
        Err(Error::Io { path, .. }) => assert!(path.ends_with("t.names")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn trailing_blank_names_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let rows = random_rows(6, 2);
    let prefix = write_table(dir.path(), "t", &rows, 2);
    std::fs::write(dir.path().join("t.names"), "  left\t\nright \n\n \n").unwrap();
    let params = IbsParams::new(2);
    let table = params.open(&prefix).unwrap();
    assert_eq!(table.names, ["left", "right"]);
    assert_eq!(table.header.sample_count, 2);
    let m = params.compute(&table, &ProgressBar::hidden()).unwrap();
    assert_eq!(m, naive(&rows, 2));
}

fn open_with_bytes(bytes: &[u8], samples: usize) -> kmer_ibs::Result<kmer_ibs::Table> {
    let dir = tempfile::tempdir().unwrap();
    let prefix = write_table(dir.path(), "t", &vec![], samples);
    std::fs::write(dir.path().join("t.table"), bytes).unwrap();
    IbsParams::new(1).open(&prefix)
}

fn format_error(res: kmer_ibs::Result<kmer_ibs::Table>) -> FormatError {
    match res {
        Err(Error::Format(e)) => e,
        other => panic!("expected a format error, got {other:?}"),
    }
}

#[test]
fn header_errors() {
    let rows = random_rows(5, 3);

    let mut bytes = table_bytes(&rows, 3, 31);
    bytes[..4].copy_from_slice(&0x11223344u32.to_le_bytes());
    assert_eq!(
        format_error(open_with_bytes(&bytes, 3)),
        FormatError::BadPrefix {
            found: 0x11223344,
            expected: TABLE_PREFIX
        }
    );

    let bytes = table_bytes(&rows, 3, 31);
    assert_eq!(
        format_error(open_with_bytes(&bytes, 4)),
        FormatError::SampleCountMismatch {
            in_header: 3,
            in_names: 4
        }
    );

    let bytes = table_bytes(&rows, 3, 25);
    assert_eq!(
        format_error(open_with_bytes(&bytes, 3)),
        FormatError::KmerLengthMismatch {
            in_header: 25,
            expected: 31
        }
    );
}

#[test]
fn size_errors() {
    let bytes = table_bytes(&vec![], 3, 31);
    assert_eq!(bytes.len() as u64, HEADER_SIZE);
    assert_eq!(
        format_error(open_with_bytes(&bytes, 3)),
        FormatError::FileTooSmall { size: HEADER_SIZE }
    );
    assert_eq!(
        format_error(open_with_bytes(&bytes[..10], 3)),
        FormatError::FileTooSmall { size: 10 }
    );

    let mut bytes = table_bytes(&random_rows(4, 3), 3, 31);
    bytes.pop();
    assert_eq!(
        format_error(open_with_bytes(&bytes, 3)),
        FormatError::TruncatedFile {
            body: 4 * 16 - 1,
            record_width: 16
        }
    );
}

#[test]
fn failed_worker_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let rows = random_rows(40, 5);
    let prefix = write_table(dir.path(), "t", &rows, 5);
    let params = IbsParams::new(4);
    let table = params.open(&prefix).unwrap();
    // Shrink the file after validation so the last ranges run short.
    let file = std::fs::OpenOptions::new()
        .write(true)
        .open(&table.path)
        .unwrap();
    file.set_len(HEADER_SIZE + 25 * 16).unwrap();
    assert!(matches!(
        params.compute(&table, &ProgressBar::hidden()),
        Err(Error::Io { .. })
    ));
}

#[test]
fn zero_threads_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = write_table(dir.path(), "t", &random_rows(3, 2), 2);
    let params = IbsParams::new(0);
    let table = params.open(&prefix).unwrap();
    assert!(matches!(
        params.compute(&table, &ProgressBar::hidden()),
        Err(Error::NoThreads)
    ));
}
