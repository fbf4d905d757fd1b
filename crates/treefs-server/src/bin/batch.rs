//! File-driven TreeFS runner.
//!
//! Replays a command script against a fresh in-memory tree with a pool of
//! consumer threads, writes the final tree dump to the output file and
//! reports the elapsed wall time.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use treefs_server::script::run_script;

/// Replay a TreeFS command script against an in-memory tree
#[derive(Parser, Debug)]
#[command(name = "treefs-batch", version, about)]
struct Args {
    /// Command script to execute, one command per line
    input: PathBuf,

    /// File the final tree dump is written to
    output: PathBuf,

    /// Number of consumer threads
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    numthreads: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let started = Instant::now();
    run_script(&args.input, &args.output, args.numthreads as usize)
        .with_context(|| format!("failed to run {}", args.input.display()))?;
    println!(
        "TreeFS completed in {:.4} seconds.",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
