//! Client session library for TreeFS name servers.
//!
//! A [`Session`] is a mounted connection: it binds its own datagram socket
//! (the server replies to the sender's address, so an unbound socket would
//! never hear back), issues one textual command per call and waits for the
//! numeric reply. Operations before a mount are impossible by construction,
//! since they are methods on the session, and [`Session::unmount`] consumes
//! it. Dropping a session removes its socket file.

use std::env;
use std::fmt;
use std::io;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::debug;

use treefs_proto::{decode_reply, Command, NodeType, Status, MAX_REQUEST_SIZE, REPLY_SIZE};

pub use treefs_proto::NodeType as Kind;

/// Distinguishes several sessions inside one process.
static NEXT_SESSION: AtomicU64 = AtomicU64::new(0);

/// Failure of a client call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The client-side socket could not be created or bound.
    #[error("could not open session: {0}")]
    OpenSession(#[source] io::Error),

    /// A send or receive on the session socket failed.
    #[error("connection error: {0}")]
    Connection(#[source] io::Error),

    /// The server's reply was not a whole status integer.
    #[error("malformed reply from server")]
    MalformedReply,

    /// The encoded request would not fit in one datagram.
    #[error("request exceeds the {MAX_REQUEST_SIZE}-byte datagram limit")]
    RequestTooLong,

    /// The server answered with an error status.
    #[error("server rejected request: {0}")]
    Rejected(Status),
}

impl ClientError {
    /// The server status behind this error, if the server produced one.
    pub fn status(&self) -> Option<Status> {
        match self {
            ClientError::Rejected(status) => Some(*status),
            ClientError::OpenSession(_) => Some(Status::OpenSession),
            ClientError::Connection(_) => Some(Status::ConnectionError),
            ClientError::MalformedReply | ClientError::RequestTooLong => None,
        }
    }
}

/// A mounted connection to a TreeFS server.
pub struct Session {
    socket: UnixDatagram,
    local_path: PathBuf,
}

impl Session {
    /// Mounts a session against the server listening at `server_path`.
    ///
    /// The client socket binds under the system temp directory at a path
    /// derived from the process id and a per-process sequence number.
    pub fn mount(server_path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let sequence = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);
        let local_path = env::temp_dir().join(format!(
            "treefs-client-{}-{sequence}",
            process::id()
        ));
        Self::mount_at(server_path, local_path)
    }

    /// Mounts a session with an explicit client socket path.
    pub fn mount_at(
        server_path: impl AsRef<Path>,
        local_path: PathBuf,
    ) -> Result<Self, ClientError> {
        // a previous run may have left its socket file behind
        let _ = std::fs::remove_file(&local_path);
        let socket = UnixDatagram::bind(&local_path).map_err(ClientError::OpenSession)?;
        socket
            .connect(server_path.as_ref())
            .map_err(ClientError::Connection)?;
        debug!(
            local = %local_path.display(),
            server = %server_path.as_ref().display(),
            "session mounted"
        );
        Ok(Self { socket, local_path })
    }

    /// Creates a file or directory at `path`.
    pub fn create(&self, path: &str, kind: NodeType) -> Result<(), ClientError> {
        self.request(&Command::Create {
            path: path.to_string(),
            kind,
        })
        .map(drop)
    }

    /// Deletes the node at `path`.
    pub fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.request(&Command::Delete {
            path: path.to_string(),
        })
        .map(drop)
    }

    /// Moves the node at `src` to `dst`.
    pub fn rename(&self, src: &str, dst: &str) -> Result<(), ClientError> {
        self.request(&Command::Rename {
            src: src.to_string(),
            dst: dst.to_string(),
        })
        .map(drop)
    }

    /// Resolves `path` to its inumber.
    pub fn lookup(&self, path: &str) -> Result<i32, ClientError> {
        self.request(&Command::Lookup {
            path: path.to_string(),
        })
    }

    /// Asks the server to dump its tree into a server-side file.
    pub fn print(&self, server_side_path: &str) -> Result<(), ClientError> {
        self.request(&Command::Print {
            path: server_side_path.to_string(),
        })
        .map(drop)
    }

    /// Ends the session. Equivalent to dropping it.
    pub fn unmount(self) {
        drop(self);
    }

    fn request(&self, command: &Command) -> Result<i32, ClientError> {
        let encoded = command.to_string();
        if encoded.len() > MAX_REQUEST_SIZE {
            return Err(ClientError::RequestTooLong);
        }

        self.socket
            .send(encoded.as_bytes())
            .map_err(ClientError::Connection)?;

        let mut buf = [0u8; REPLY_SIZE];
        let received = self.socket.recv(&mut buf).map_err(ClientError::Connection)?;
        if received != REPLY_SIZE {
            return Err(ClientError::MalformedReply);
        }

        let code = decode_reply(buf);
        debug!(%command, code, "request completed");
        if code >= 0 {
            Ok(code)
        } else {
            Err(ClientError::Rejected(
                Status::from_code(code).unwrap_or(Status::Other),
            ))
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("local_path", &self.local_path)
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.local_path);
    }
}
