//! Aggregate buildah timing logs.
//!
//! Reads the newline-delimited JSON records written by the client's timing
//! log and prints per-subcommand statistics for every subcommand with at
//! least two samples.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use buildah::timings;

#[derive(Debug, Parser)]
#[command(name = "buildah-agg", about = "Aggregate buildah timing records")]
struct Cli {
    /// Timing log to read; defaults to stdin.
    file: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let input = match &cli.file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let records = timings::parse_records(&input).context("malformed timing log")?;
    for summary in timings::summarize(&records) {
        println!(
            "{:<10} total {:<8.4} count {:<3} mean {:.4} median {:.4} stdev {:.4}",
            summary.subcommand,
            summary.total,
            summary.count,
            summary.mean,
            summary.median,
            summary.stdev,
        );
    }
    Ok(())
}
