use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use log::{error, info};

use binclean::{io, BinCleaner, CleanConfig, DEFAULT_MIN_BINS_PER_GC_BUCKET};

/// Correct genomic bin read counts for GC bias and sequencing artifacts.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input bin file (tab-delimited; .gz supported)
    #[arg(short, long)]
    infile: PathBuf,

    /// Output file for the cleaned bins
    #[arg(short, long)]
    outfile: PathBuf,

    /// Perform GC normalization
    #[arg(short = 'g', long)]
    gcnorm: bool,

    /// Filter out genomically large bins
    #[arg(short = 's', long)]
    filtsize: bool,

    /// Filter outlier points
    #[arg(short = 'r', long)]
    outliers: bool,

    /// Write the local-SD average here and filter regions of FFPE bias
    #[arg(short = 'f', long)]
    ffpeoutliers: Option<PathBuf>,

    /// Minimum number of bins per GC bucket for direct statistics
    #[arg(short = 'w', long, default_value_t = DEFAULT_MIN_BINS_PER_GC_BUCKET)]
    min_bins_per_gc: usize,
}

fn run(args: Args) -> Result<()> {
    let bins = io::read_bins(&args.infile)?;
    info!("read {} bins from {}", bins.len(), args.infile.display());

    let config = CleanConfig::builder()
        .perform_gc_normalization(args.gcnorm)
        .filter_large_bins(args.filtsize)
        .remove_outliers(args.outliers)
        .maybe_ffpe_output_path(args.ffpeoutliers)
        .min_bins_per_gc_bucket(args.min_bins_per_gc)
        .build();

    let (bins, summary) = BinCleaner::new(config).run(bins)?;
    io::write_bins(&args.outfile, &bins)?;
    info!(
        "wrote {} cleaned bins to {} ({} input)",
        summary.output_bins,
        args.outfile.display(),
        summary.input_bins
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("{error:#}");
            ExitCode::FAILURE
        }
    }
}
