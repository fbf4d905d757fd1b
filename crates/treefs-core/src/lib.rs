//! Concurrent in-memory hierarchical name service engine.
//!
//! The engine keeps a tree of named nodes (files and directories) inside a
//! fixed-capacity inode table. Each slot carries its own reader/writer lock;
//! operations walk the tree from the root acquiring locks hand-over-hand in
//! root-to-leaf order, which serialises conflicting mutations at the deepest
//! shared ancestor while leaving disjoint subtrees fully concurrent.
//!
//! [`TreeFs`] is the public entry point. Everything below it (the slot table,
//! the path walker, the lock bookkeeping) is also exported for callers that
//! want to build their own operations on top of the table.

pub mod error;
pub mod inode;
pub mod limits;
pub mod path;

mod fs;
mod lock_set;
mod resolve;

pub use error::FsError;
pub use fs::TreeFs;
pub use inode::{Inumber, NodeKind, ROOT_INUMBER};
pub use path::TreePath;
