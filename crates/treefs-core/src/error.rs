//! Error types for engine operations.

use thiserror::Error;

/// Failure of a tree operation.
///
/// All variants are non-fatal: the tree is left exactly as it was before the
/// failing call, and every lock taken on the way is released.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FsError {
    /// The path (or one of its components) does not resolve.
    #[error("path not found: {path}")]
    NotFound { path: String },

    /// The target name already exists in the destination directory.
    #[error("already exists: {path}")]
    AlreadyExists { path: String },

    /// A path component expected to be a directory is a file.
    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    /// Refusing to delete a directory that still has entries.
    #[error("directory not empty: {path}")]
    DirectoryNotEmpty { path: String },

    /// No free slot left in the inode table.
    #[error("inode table full")]
    TableFull,

    /// The parent directory has no free entry cell.
    #[error("directory full: {path}")]
    DirectoryFull { path: String },

    /// The leaf name is empty, contains `/`, or exceeds the name limit.
    #[error("invalid name: {name:?}")]
    InvalidName { name: String },

    /// Moving a node into its own subtree would disconnect it from the root.
    #[error("cannot move {src} into its own subtree at {dst}")]
    RenameCycle { src: String, dst: String },
}
