use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use katss::cli::counters::ScanCounters;
use katss::cli::io::{check_input, create_output_dir};
use katss::cli::opts::{IOArgs, KmerArgs};
use katss::kmers::enrichment::{ikke, prob_ikke};
use katss::kmers::options::IkkeOptions;
use katss::kmers::write::{write_count_table, write_enrichments};
use katss::kmers::KmerCounter;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Count k-mers in sequencing data
#[derive(Parser)]
#[command(
    name = "katss",
    about = "Count k-mers and their enrichment in sequence files",
    long_about = "Count k-mers and their enrichment in sequence files.

Input may be FASTA, FASTQ or one sequence per line, plain or gzip/zlib compressed.

EXAMPLES:
    // Count 5-mers
    $ katss count -i <reads.fq.gz> -o <path/to/output_directory/> -k 5 -t <N>

    // Count 5-mers, then remove every window touching the given motifs
    $ katss uncount -i <reads.fq.gz> -o <out/> -k 5 -m UGCAUG -m GCAUG

    // Iterative k-mer knockout against a control
    $ katss ikke -i <bound.fa> -c <input.fa> -o <out/> -k 5 --iterations 10

    // Iterative k-mer knockout against frequencies predicted from the input
    $ katss ikke -i <bound.fa> -o <out/> -k 5 --independent-probs
    ",
    version = "0.1.0"
)]
struct Cli {
    /// Log debug messages [flag]
    #[clap(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Count every k-mer of one file
    Count {
        #[command(flatten)]
        io: IOArgs,
        #[command(flatten)]
        kmer: KmerArgs,
    },
    /// Count, then remove the windows overlapping each motif in turn
    Uncount {
        #[command(flatten)]
        io: IOArgs,
        #[command(flatten)]
        kmer: KmerArgs,
        /// Motif to remove; repeat to remove several, in order [string]
        #[clap(short = 'm', long = "motif", num_args = 1.., required = true, help_heading = "Removal")]
        motifs: Vec<String>,
    },
    /// Iterative k-mer knockout enrichment against a control file
    Ikke {
        #[command(flatten)]
        io: IOArgs,
        #[command(flatten)]
        kmer: KmerArgs,
        /// Control sequence file; required unless --independent-probs [path]
        #[clap(short = 'c', long, help_heading = "Core")]
        control: Option<PathBuf>,
        /// Predict control frequencies from the mono- and dinucleotides of
        /// the input instead of reading a control file [flag]
        #[clap(long, help_heading = "Enrichment")]
        independent_probs: bool,
        /// Number of k-mers to knock out [integer]
        #[clap(long, default_value = "10", help_heading = "Enrichment")]
        iterations: usize,
        /// Report log2 enrichments [flag]
        #[clap(short = 'n', long, help_heading = "Enrichment")]
        normalize: bool,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
    std::process::exit(0);
}

fn run() -> Result<()> {
    let start_time = Instant::now();
    let opt = Cli::parse();
    init_logging(opt.verbose);

    match opt.command {
        Command::Count { io, kmer } => {
            let counter = count_input(&io, &kmer)?;
            println!("Start: Writing counts to disk");
            write_count_table(counter.table(), counter.spec(), &io.output_dir)?;
        }
        Command::Uncount { io, kmer, motifs } => {
            if motifs.iter().any(|m| m.is_empty()) {
                bail!("--motif must not be empty");
            }
            let mut counter = count_input(&io, &kmer)?;
            for motif in &motifs {
                println!("Start: Removing {}", motif);
                let report = counter
                    .uncount_path(&io.input, motif)
                    .with_context(|| format!("removing {}", motif))?;
                println!(
                    "       {} occurrences, {} windows removed, {} skipped, {} underflows",
                    report.occurrences, report.decremented, report.skipped, report.underflows
                );
            }
            println!("Start: Writing counts to disk");
            write_count_table(counter.table(), counter.spec(), &io.output_dir)?;
        }
        Command::Ikke {
            io,
            kmer,
            control,
            independent_probs,
            iterations,
            normalize,
        } => {
            check_input(&io.input)?;
            let control = match (control, independent_probs) {
                (Some(control), false) => {
                    check_input(&control)?;
                    Some(control)
                }
                (Some(control), true) => {
                    warn!(control = ?control, "control file ignored with --independent-probs");
                    None
                }
                (None, true) => None,
                (None, false) => bail!("--control is required unless --independent-probs is set"),
            };
            if independent_probs && kmer.kmer_size < 2 {
                bail!("--independent-probs needs --kmer-size of at least 2");
            }
            create_output_dir(&io.output_dir)?;
            let options = IkkeOptions {
                count: kmer.count_options(io.n_threads),
                iterations,
                normalize,
            };
            println!("Start: Iterative k-mer knockout");
            let pb = spinner("| Knocking out k-mers");
            let rows = match &control {
                Some(control) => ikke(&io.input, control, &options)?,
                None => prob_ikke(&io.input, &options)?,
            };
            pb.finish_with_message("| Finished knockout");
            for (i, row) in rows.iter().enumerate() {
                println!("       {:>3} {} {:.4}", i + 1, row.kmer, row.value);
            }
            println!("Start: Writing enrichments to disk");
            let path = io.output_dir.join(format!("k{}_ikke.tsv", kmer.kmer_size));
            write_enrichments(&path, &rows)?;
        }
    }

    println!("Elapsed time: {:.2?}", start_time.elapsed());
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn spinner(msg: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("       {spinner} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn count_input(io: &IOArgs, kmer: &KmerArgs) -> Result<KmerCounter> {
    let format = check_input(&io.input)?;
    create_output_dir(&io.output_dir)?;
    println!("Start: Counting {}-mers ({})", kmer.kmer_size, format);

    let pb = spinner("| Counting");
    let counter = KmerCounter::count_path(&io.input, kmer.count_options(io.n_threads))
        .with_context(|| format!("counting {:?}", io.input))?;
    pb.finish_with_message("| Finished counting");

    print_counters(counter.scan_counters());
    Ok(counter)
}

fn print_counters(c: &ScanCounters) {
    println!(
        "       {} records, {} windows, {} counted, {} skipped",
        c.records, c.windows, c.counted, c.skipped
    );
}
