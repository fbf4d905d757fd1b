//! The textual request commands.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Rejected request text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty request")]
    Empty,

    #[error("unknown command {token:?}")]
    UnknownCommand { token: String },

    #[error("missing argument for {token:?}")]
    MissingArgument { token: char },

    #[error("unexpected trailing input")]
    TrailingInput,

    #[error("invalid node type {found:?} (expected \"f\" or \"d\")")]
    InvalidNodeType { found: String },
}

/// Node kind as spelled on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    File,
    Directory,
}

impl NodeType {
    pub fn as_char(self) -> char {
        match self {
            NodeType::File => 'f',
            NodeType::Directory => 'd',
        }
    }
}

impl FromStr for NodeType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "f" => Ok(NodeType::File),
            "d" => Ok(NodeType::Directory),
            other => Err(ProtocolError::InvalidNodeType {
                found: other.to_string(),
            }),
        }
    }
}

/// One request, as carried in a single datagram.
///
/// `Display` produces the wire text and `FromStr` parses it, so the two
/// directions round-trip:
///
/// ```
/// use treefs_proto::{Command, NodeType};
///
/// let cmd = Command::Create { path: "/logs".into(), kind: NodeType::Directory };
/// assert_eq!(cmd.to_string(), "c /logs d");
/// assert_eq!("c /logs d".parse::<Command>().unwrap(), cmd);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `c <path> <f|d>`: create a file or directory.
    Create { path: String, kind: NodeType },
    /// `d <path>`: delete a node.
    Delete { path: String },
    /// `m <src> <dst>`: move a node, subtree and inumber intact.
    Rename { src: String, dst: String },
    /// `l <path>`: resolve a path to its inumber.
    Lookup { path: String },
    /// `p <file>`: dump the tree into a server-side file.
    Print { path: String },
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let token = parts.next().ok_or(ProtocolError::Empty)?;

        let mut arg = |token: char| {
            parts
                .next()
                .map(str::to_string)
                .ok_or(ProtocolError::MissingArgument { token })
        };

        let command = match token {
            "c" => Command::Create {
                path: arg('c')?,
                kind: arg('c')?.parse()?,
            },
            "d" => Command::Delete { path: arg('d')? },
            "m" => Command::Rename {
                src: arg('m')?,
                dst: arg('m')?,
            },
            "l" => Command::Lookup { path: arg('l')? },
            "p" => Command::Print { path: arg('p')? },
            other => {
                return Err(ProtocolError::UnknownCommand {
                    token: other.to_string(),
                })
            }
        };

        if parts.next().is_some() {
            return Err(ProtocolError::TrailingInput);
        }
        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Create { path, kind } => write!(f, "c {path} {}", kind.as_char()),
            Command::Delete { path } => write!(f, "d {path}"),
            Command::Rename { src, dst } => write!(f, "m {src} {dst}"),
            Command::Lookup { path } => write!(f, "l {path}"),
            Command::Print { path } => write!(f, "p {path}"),
        }
    }
}
