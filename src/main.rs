use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    path::PathBuf,
};

use anyhow::Context;
use clap::Parser;
use kmer_ibs::{IbsParams, IndexKind, bits, output::MatrixLayout};
use log::info;

/// Identity-by-state between samples of a k-mer presence/absence table.
#[derive(clap::Parser)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Compute the IBS matrix of `<prefix>.table` and write it as TSV.
    Ibs {
        /// Table path prefix; `<prefix>.names` and `<prefix>.table` must exist.
        #[arg(short = 't', long)]
        kmers_table: PathBuf,
        /// Write the tab-separated matrix here.
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        params: IbsParams,
        /// Which cells to write.
        #[arg(long, value_enum, default_value_t = MatrixLayout::Full)]
        layout: MatrixLayout,
        /// Also save the matrix in binary form.
        #[arg(long)]
        binary: Option<PathBuf>,
    },
    /// Look up k-mers in a database of tagged canonical k-mers.
    Lookup {
        /// Flat database file of little-endian u64 values.
        #[arg(long)]
        db: PathBuf,
        #[arg(long, value_enum, default_value_t = IndexKind::Vector)]
        index: IndexKind,
        /// k-mer length of the queries.
        #[arg(short, default_value_t = 31)]
        k: usize,
        /// Sort the vector database on load instead of requiring sorted input.
        #[arg(long)]
        sort: bool,
        /// For the hash index, only report hits stored in the query's orientation.
        #[arg(long)]
        same_strand: bool,
        /// File with one k-mer per line, or stdin.
        queries: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    match args.command {
        Command::Ibs {
            kmers_table,
            output,
            params,
            layout,
            binary,
        } => ibs(kmers_table, output, params, layout, binary),
        Command::Lookup {
            db,
            index,
            k,
            sort,
            same_strand,
            queries,
        } => lookup(db, index, k, sort, same_strand, queries),
    }
}

fn ibs(
    prefix: PathBuf,
    output: PathBuf,
    params: IbsParams,
    layout: MatrixLayout,
    binary: Option<PathBuf>,
) -> anyhow::Result<()> {
    let table = params.open(&prefix)?;

    let style = indicatif::ProgressStyle::with_template(
        "{msg:.bold} [{elapsed_precise:.cyan}] {bar} {pos}/{len} ({percent:>3}%)",
    )?
    .progress_chars("##-");
    let progress = indicatif::ProgressBar::new(table.layout.record_count)
        .with_style(style)
        .with_message("Scanning")
        .with_finish(indicatif::ProgressFinish::AndLeave);

    let start = std::time::Instant::now();
    let matrix = params.compute(&table, &progress)?;
    progress.finish();
    info!("Computing the IBS matrix took {:?}", start.elapsed());

    kmer_ibs::output::write_tsv_file(&output, &table.names, &matrix, layout)?;
    if let Some(binary) = binary {
        matrix.save(&binary)?;
    }
    info!("Wrote {}", output.display());
    Ok(())
}

fn lookup(
    db: PathBuf,
    index: IndexKind,
    k: usize,
    sort: bool,
    same_strand: bool,
    queries: Option<PathBuf>,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        (1..=bits::MAX_K).contains(&k),
        "k must be between 1 and {}",
        bits::MAX_K
    );
    let db = index.build(&db, sort)?;
    info!("Loaded {} k-mers", db.len());

    let input: Box<dyn BufRead> = match &queries {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(std::io::stdin().lock()),
    };

    let mut out = std::io::BufWriter::new(std::io::stdout().lock());
    for line in input.lines() {
        let line = line?;
        let seq = line.trim();
        if seq.is_empty() {
            continue;
        }
        anyhow::ensure!(
            seq.len() == k,
            "query {seq:?} has length {}, expected {k}",
            seq.len()
        );
        let kmer = bits::encode_kmer(seq)?;
        let hit = match &db {
            kmer_ibs::KmerDb::Hash(index) if same_strand => index.contains_same_strand(kmer, k),
            db => db.contains(kmer, k),
        };
        writeln!(out, "{seq}\t{}", hit as u8)?;
    }
    out.flush()?;
    Ok(())
}
