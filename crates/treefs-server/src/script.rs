//! File-driven mode: replay a command script through a bounded queue.
//!
//! The script holds one command per line in the same textual format the
//! datagram protocol uses; blank lines and `#` comments are skipped, and a
//! malformed line aborts the run. Lines flow through a bounded channel into
//! a pool of consumer threads; when the producer is done it drops its end,
//! and the consumers drain the queue until the disconnect reaches them.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::bounded;
use thiserror::Error;
use tracing::{debug, info};

use treefs_core::TreeFs;
use treefs_proto::{Command, ProtocolError};

use crate::dispatcher;

/// Commands buffered between the script reader and the consumers.
pub const QUEUE_CAPACITY: usize = 10;

/// Longest accepted script line, in bytes.
pub const MAX_LINE_LENGTH: usize = 100;

/// Failure of a batch run.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: ProtocolError,
    },

    #[error("line {line}: longer than {MAX_LINE_LENGTH} bytes")]
    LineTooLong { line: usize },
}

/// Runs the script at `input` with `workers` consumer threads, then writes
/// the final tree dump to `output`.
pub fn run_script(input: &Path, output: &Path, workers: usize) -> Result<(), ScriptError> {
    let fs = Arc::new(TreeFs::new());
    run_script_on(&fs, input, output, workers)
}

/// Like [`run_script`], against a caller-supplied filesystem.
pub fn run_script_on(
    fs: &Arc<TreeFs>,
    input: &Path,
    output: &Path,
    workers: usize,
) -> Result<(), ScriptError> {
    let reader = BufReader::new(File::open(input)?);
    let (tx, rx) = bounded::<Command>(QUEUE_CAPACITY);

    let produced = thread::scope(|scope| {
        for index in 0..workers {
            let rx = rx.clone();
            let fs = Arc::clone(fs);
            thread::Builder::new()
                .name(format!("treefs-batch-{index}"))
                .spawn_scoped(scope, move || {
                    while let Ok(command) = rx.recv() {
                        let code = dispatcher::apply(&fs, &command);
                        debug!(%command, code, "applied");
                    }
                })?;
        }
        drop(rx);

        // the calling thread is the producer
        let mut produced = 0usize;
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.len() > MAX_LINE_LENGTH {
                return Err(ScriptError::LineTooLong { line: index + 1 });
            }
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let command: Command = trimmed.parse().map_err(|source| ScriptError::Parse {
                line: index + 1,
                source,
            })?;
            if tx.send(command).is_err() {
                break;
            }
            produced += 1;
        }
        drop(tx);
        Ok::<usize, ScriptError>(produced)
    })?;

    info!(commands = produced, "script drained");

    let mut sink = BufWriter::new(File::create(output)?);
    fs.print_tree(&mut sink)?;
    sink.flush()?;
    Ok(())
}
