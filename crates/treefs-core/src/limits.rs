//! Capacity limits for the engine.
//!
//! These are compile-time defaults, not a protocol: the table capacity can be
//! overridden per instance via [`crate::inode::InodeTable::with_capacity`].

/// Default number of slots in the inode table, root included.
pub const INODE_TABLE_SIZE: usize = 50;

/// Number of entry cells in every directory payload.
pub const MAX_DIR_ENTRIES: usize = 20;

/// Longest accepted child name, in bytes.
pub const MAX_FILE_NAME: usize = 40;
