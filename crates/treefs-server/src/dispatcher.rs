//! Datagram dispatcher: a worker pool sharing one Unix datagram socket.
//!
//! Each worker loops over `recv_from` / parse / apply / `send_to`. The
//! kernel hands every datagram to exactly one worker, so the socket itself
//! is the work queue and no further coordination is needed. No per-client
//! state is kept; the sender's address is the whole session.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::process;
use std::str;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use treefs_core::{FsError, NodeKind, TreeFs};
use treefs_proto::{encode_reply, Command, NodeType, Status, MAX_REQUEST_SIZE};

/// A bound datagram endpoint plus the filesystem it serves.
pub struct Dispatcher {
    socket: Arc<UnixDatagram>,
    socket_path: PathBuf,
    fs: Arc<TreeFs>,
}

impl Dispatcher {
    /// Binds the socket at `socket_path`, replacing any stale socket file
    /// left behind by an earlier run.
    pub fn bind(socket_path: &Path, fs: Arc<TreeFs>) -> io::Result<Self> {
        match fs::remove_file(socket_path) {
            Ok(()) => debug!(path = %socket_path.display(), "removed stale socket"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        let socket = UnixDatagram::bind(socket_path)?;
        info!(path = %socket_path.display(), "listening");
        Ok(Self {
            socket: Arc::new(socket),
            socket_path: socket_path.to_path_buf(),
            fs,
        })
    }

    /// The path the socket is bound at.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Spawns `count` worker threads sharing the socket and returns their
    /// handles. The workers run until the process exits.
    pub fn spawn_workers(&self, count: usize) -> io::Result<Vec<JoinHandle<()>>> {
        (0..count)
            .map(|index| {
                let socket = Arc::clone(&self.socket);
                let fs = Arc::clone(&self.fs);
                thread::Builder::new()
                    .name(format!("treefs-worker-{index}"))
                    .spawn(move || worker_loop(&socket, &fs))
            })
            .collect()
    }

    /// Spawns the workers and parks on them. Does not return while the
    /// socket stays healthy; shutdown is the process exiting.
    pub fn run(&self, workers: usize) -> io::Result<()> {
        for handle in self.spawn_workers(workers)? {
            if handle.join().is_err() {
                error!("worker panicked");
            }
        }
        Ok(())
    }
}

fn worker_loop(socket: &UnixDatagram, fs: &TreeFs) {
    let mut buf = [0u8; MAX_REQUEST_SIZE];
    loop {
        let (len, peer) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                error!(error = %err, "receive failed, worker exiting");
                return;
            }
        };

        let code = handle_datagram(fs, &buf[..len]);

        // Datagram clients must bind their own path to be reachable.
        let Some(reply_to) = peer.as_pathname() else {
            warn!("request from unbound client, dropping reply");
            continue;
        };
        if let Err(err) = socket.send_to(&encode_reply(code), reply_to) {
            warn!(peer = %reply_to.display(), error = %err, "reply failed");
        }
    }
}

/// Parses one request datagram and applies it, returning the reply code.
pub fn handle_datagram(fs: &TreeFs, raw: &[u8]) -> i32 {
    let Ok(text) = str::from_utf8(raw) else {
        debug!("rejected non-utf8 request");
        return Status::InvalidCommand.code();
    };
    // tolerate the trailing NUL some clients append
    let text = text.trim_end_matches('\0');
    match text.parse::<Command>() {
        Ok(command) => apply(fs, &command),
        Err(err) => {
            debug!(request = text, error = %err, "rejected request");
            Status::InvalidCommand.code()
        }
    }
}

/// Applies one command against the filesystem, returning the reply code.
///
/// A `p` dump that cannot be written is fatal: the process exits non-zero.
pub fn apply(fs: &TreeFs, command: &Command) -> i32 {
    debug!(%command, "applying");
    match command {
        Command::Create { path, kind } => completion(fs.create(path, node_kind(*kind))),
        Command::Delete { path } => completion(fs.delete(path)),
        Command::Rename { src, dst } => completion(fs.rename(src, dst)),
        Command::Lookup { path } => match fs.lookup(path) {
            Ok(inumber) => i32::try_from(inumber).unwrap_or_else(|_| Status::Other.code()),
            Err(err) => status_for(&err).code(),
        },
        Command::Print { path } => {
            if let Err(err) = print_to_file(fs, path) {
                error!(path, error = %err, "tree dump failed, terminating");
                process::exit(1);
            }
            0
        }
    }
}

fn completion(result: Result<(), FsError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            debug!(error = %err, "operation failed");
            status_for(&err).code()
        }
    }
}

fn print_to_file(fs: &TreeFs, path: &str) -> io::Result<()> {
    let mut sink = BufWriter::new(File::create(path)?);
    fs.print_tree(&mut sink)?;
    sink.flush()
}

fn node_kind(wire: NodeType) -> NodeKind {
    match wire {
        NodeType::File => NodeKind::File,
        NodeType::Directory => NodeKind::Directory,
    }
}

/// Maps an engine error to its wire status.
pub fn status_for(err: &FsError) -> Status {
    match err {
        FsError::NotFound { .. } => Status::NotFound,
        FsError::AlreadyExists { .. } => Status::AlreadyExists,
        FsError::NotADirectory { .. } => Status::NotADirectory,
        FsError::DirectoryNotEmpty { .. } => Status::DirectoryNotEmpty,
        FsError::TableFull => Status::TableFull,
        FsError::DirectoryFull { .. } | FsError::InvalidName { .. } | FsError::RenameCycle { .. } => {
            Status::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_datagram_applies_commands() {
        let fs = TreeFs::new();
        assert_eq!(handle_datagram(&fs, b"c /a d"), 0);
        assert_eq!(handle_datagram(&fs, b"c /a/x f"), 0);
        let inumber = handle_datagram(&fs, b"l /a/x");
        assert!(inumber > 0);
        assert_eq!(handle_datagram(&fs, b"d /a/x"), 0);
        assert_eq!(
            handle_datagram(&fs, b"l /a/x"),
            Status::NotFound.code()
        );
    }

    #[test]
    fn test_handle_datagram_tolerates_trailing_nul() {
        let fs = TreeFs::new();
        assert_eq!(handle_datagram(&fs, b"c /a d\0"), 0);
    }

    #[test]
    fn test_handle_datagram_rejects_garbage() {
        let fs = TreeFs::new();
        assert_eq!(
            handle_datagram(&fs, b"frobnicate /a"),
            Status::InvalidCommand.code()
        );
        assert_eq!(
            handle_datagram(&fs, &[0xff, 0xfe]),
            Status::InvalidCommand.code()
        );
        assert_eq!(handle_datagram(&fs, b""), Status::InvalidCommand.code());
    }

    #[test]
    fn test_status_mapping() {
        let fs = TreeFs::new();
        assert_eq!(handle_datagram(&fs, b"c /a d"), 0);
        assert_eq!(
            handle_datagram(&fs, b"c /a f"),
            Status::AlreadyExists.code()
        );
        assert_eq!(
            handle_datagram(&fs, b"d /a/missing"),
            Status::NotFound.code()
        );
        assert_eq!(handle_datagram(&fs, b"c /a/x f"), 0);
        assert_eq!(
            handle_datagram(&fs, b"c /a/x/y f"),
            Status::NotADirectory.code()
        );
        assert_eq!(
            handle_datagram(&fs, b"d /a"),
            Status::DirectoryNotEmpty.code()
        );
        assert_eq!(
            handle_datagram(&fs, b"m /a /a/sub"),
            Status::Other.code()
        );
    }
}
