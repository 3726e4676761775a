//! Tab-separated IBS matrix output.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::{IbsMatrix, Result, error::IoContext};

/// Which cells of the matrix are written.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MatrixLayout {
    /// Symmetric matrix, the lower triangle mirrored above the diagonal.
    #[default]
    Full,
    /// Only the computed lower triangle; cells above the diagonal are 0.
    Lower,
}

/// Write a `Samples` header row and one row per sample.
pub fn write_tsv<W: Write>(
    out: &mut W,
    names: &[String],
    matrix: &IbsMatrix,
    layout: MatrixLayout,
) -> std::io::Result<()> {
    assert_eq!(names.len(), matrix.len());
    write!(out, "Samples")?;
    for name in names {
        write!(out, "\t{name}")?;
    }
    writeln!(out)?;
    for (j, name) in names.iter().enumerate() {
        write!(out, "{name}")?;
        for i in 0..names.len() {
            let v = match layout {
                MatrixLayout::Full => matrix.pair(j, i),
                MatrixLayout::Lower => matrix.get(j, i),
            };
            write!(out, "\t{v}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn write_tsv_file(
    path: &Path,
    names: &[String],
    matrix: &IbsMatrix,
    layout: MatrixLayout,
) -> Result<()> {
    let mut out = BufWriter::new(File::create(path).at(path)?);
    write_tsv(&mut out, names, matrix, layout).at(path)?;
    out.flush().at(path)
}
