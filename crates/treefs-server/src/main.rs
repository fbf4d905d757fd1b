//! TreeFS name server.
//!
//! Binds a Unix datagram socket, spawns a fixed pool of worker threads and
//! serves textual commands until killed. SIGINT/SIGTERM remove the socket
//! file and exit; in-flight requests are not drained.

use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use treefs_core::TreeFs;
use treefs_server::dispatcher::Dispatcher;

/// In-memory hierarchical name server over a Unix datagram socket
#[derive(Parser, Debug)]
#[command(name = "treefsd", version, about)]
struct Args {
    /// Number of worker threads
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    numthreads: u32,

    /// Path of the Unix datagram socket to bind
    socket: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let fs = Arc::new(TreeFs::new());
    let dispatcher = Dispatcher::bind(&args.socket, fs)
        .with_context(|| format!("failed to bind socket at {}", args.socket.display()))?;

    let socket_path = args.socket.clone();
    ctrlc::set_handler(move || {
        let _ = std::fs::remove_file(&socket_path);
        exit(0);
    })
    .context("failed to install signal handler")?;

    info!(workers = args.numthreads, "serving");
    dispatcher
        .run(args.numthreads as usize)
        .context("worker pool failed")?;
    Ok(())
}
