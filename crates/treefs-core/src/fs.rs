//! Tree operations: create, delete, rename, lookup, print.
//!
//! Each operation resolves the paths it needs through the resolver, keeping
//! every acquired lock in one [`LockSet`] local to the call. The set's drop
//! releases the locks in reverse acquisition order on every return path, so
//! no validation failure can leak a lock.

use std::io;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::FsError;
use crate::inode::{InodeTable, InsertError, Inumber, NodeKind, Slot, ROOT_INUMBER};
use crate::lock_set::LockSet;
use crate::path::{validate_name, TreePath};
use crate::resolve::{resolve, resolve_rename_parents, Intent};

/// The filesystem: an inode table plus the operations on it.
///
/// All operations take `&self` and are safe to call from any number of
/// threads; conflicting calls serialise on the per-slot locks at the deepest
/// path node they share.
#[derive(Debug, Default)]
pub struct TreeFs {
    table: InodeTable,
    /// Serialises cross-directory renames against each other. A rename holds
    /// writer locks in two subtrees at once; two unserialised renames could
    /// each camp in the other's subtree. Single-directory renames and all
    /// other operations descend one chain and never need this.
    rename_serial: Mutex<()>,
}

impl TreeFs {
    /// A filesystem with the default table capacity and an empty root.
    pub fn new() -> Self {
        Self::with_capacity(crate::limits::INODE_TABLE_SIZE)
    }

    /// A filesystem whose table holds `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: InodeTable::with_capacity(capacity),
            rename_serial: Mutex::new(()),
        }
    }

    /// The underlying table, for capacity and occupancy inspection.
    pub fn table(&self) -> &InodeTable {
        &self.table
    }

    /// Creates a file or directory at `path`.
    ///
    /// The parent directory must already exist; the leaf name must be free.
    pub fn create(&self, path: &str, kind: NodeKind) -> Result<(), FsError> {
        let path = TreePath::new(path);
        let (parent_path, name) = split_parent_child(&path)?;
        validate_name(name)?;

        let mut locks = LockSet::new();
        let parent = resolve(&self.table, &parent_path, Intent::Create, &mut locks)?;
        let entries = locks.dir(parent).ok_or_else(|| FsError::NotADirectory {
            path: parent_path.to_string(),
        })?;
        if entries.lookup(name).is_some() {
            return Err(FsError::AlreadyExists {
                path: path.to_string(),
            });
        }

        let child = self.table.alloc(kind)?;
        let Some(entries) = locks.dir_mut(parent) else {
            // resolve write-locked the parent and we just saw it is a directory
            self.table.free(child);
            return Err(FsError::NotADirectory {
                path: parent_path.to_string(),
            });
        };
        if let Err(err) = entries.insert(name, child) {
            // the freshly allocated node is not linked anywhere yet
            self.table.free(child);
            return Err(match err {
                InsertError::Full => FsError::DirectoryFull {
                    path: parent_path.to_string(),
                },
                InsertError::Duplicate => FsError::AlreadyExists {
                    path: path.to_string(),
                },
            });
        }

        debug!(path = %path, kind = %kind, inumber = child, "created node");
        Ok(())
    }

    /// Deletes the node at `path`. Directories must be empty.
    pub fn delete(&self, path: &str) -> Result<(), FsError> {
        let path = TreePath::new(path);
        let (parent_path, name) = split_parent_child(&path)?;
        validate_name(name)?;

        let mut locks = LockSet::new();
        let parent = resolve(&self.table, &parent_path, Intent::Delete, &mut locks)?;
        let child = locks
            .dir(parent)
            .ok_or_else(|| FsError::NotADirectory {
                path: parent_path.to_string(),
            })?
            .lookup(name)
            .ok_or_else(|| FsError::NotFound {
                path: path.to_string(),
            })?;

        // The child is only reachable through the write-locked parent, so
        // this acquisition cannot contend with another tree walk.
        let mut child_guard = self.table.slot(child).write();
        let Slot::InUse(node) = &*child_guard else {
            return Err(FsError::NotFound {
                path: path.to_string(),
            });
        };
        if node.dir().is_some_and(|entries| !entries.is_empty()) {
            return Err(FsError::DirectoryNotEmpty {
                path: path.to_string(),
            });
        }

        let Some(entries) = locks.dir_mut(parent) else {
            return Err(FsError::NotADirectory {
                path: parent_path.to_string(),
            });
        };
        entries.remove(child);
        *child_guard = Slot::Free;

        debug!(path = %path, inumber = child, "deleted node");
        Ok(())
    }

    /// Moves the node at `src` to the path `dst`, keeping its inumber and
    /// its whole subtree untouched.
    ///
    /// Both parent chains are locked in a single root-to-leaf descent that
    /// writer-locks the two parent directories and reader-locks everything
    /// else; which positions get the writer lock is decided syntactically
    /// from the component lists before any lock is taken, so the acquisition
    /// order always follows the tree. Every lock stays held until the two
    /// entries are rewritten. Moving a node into its own subtree is refused:
    /// it would disconnect the subtree from the root.
    pub fn rename(&self, src: &str, dst: &str) -> Result<(), FsError> {
        let src = TreePath::new(src);
        let dst = TreePath::new(dst);
        let (src_parent, src_name) = split_parent_child(&src)?;
        let (dst_parent, dst_name) = split_parent_child(&dst)?;
        validate_name(src_name)?;
        validate_name(dst_name)?;

        let same_parent = src_parent == dst_parent;
        let _serial = if same_parent {
            None
        } else {
            Some(self.rename_serial.lock())
        };

        let mut locks = LockSet::new();
        let (src_dir, dst_dir) =
            resolve_rename_parents(&self.table, &src_parent, &dst_parent, &mut locks)?;

        let child = locks
            .dir(src_dir)
            .ok_or_else(|| FsError::NotADirectory {
                path: src_parent.to_string(),
            })?
            .lookup(src_name)
            .ok_or_else(|| FsError::NotFound {
                path: src.to_string(),
            })?;
        let dst_entries = locks.dir(dst_dir).ok_or_else(|| FsError::NotADirectory {
            path: dst_parent.to_string(),
        })?;
        if dst_entries.lookup(dst_name).is_some() {
            return Err(FsError::AlreadyExists {
                path: dst.to_string(),
            });
        }

        // The chain is read off the locked prefix. The moved node sitting on
        // the destination's ancestor chain is exactly the cycle case.
        if chain(&locks, &dst_parent).contains(&child) {
            return Err(FsError::RenameCycle {
                src: src.to_string(),
                dst: dst.to_string(),
            });
        }

        let Some(src_entries) = locks.dir_mut(src_dir) else {
            return Err(FsError::NotADirectory {
                path: src_parent.to_string(),
            });
        };
        src_entries.remove(child);
        let Some(dst_entries) = locks.dir_mut(dst_dir) else {
            return Err(FsError::NotADirectory {
                path: dst_parent.to_string(),
            });
        };
        if let Err(err) = dst_entries.insert(dst_name, child) {
            // the vacated source cell is still free; put the entry back
            if let Some(src_entries) = locks.dir_mut(src_dir) {
                let _ = src_entries.insert(src_name, child);
            }
            return Err(match err {
                InsertError::Full => FsError::DirectoryFull {
                    path: dst_parent.to_string(),
                },
                InsertError::Duplicate => FsError::AlreadyExists {
                    path: dst.to_string(),
                },
            });
        }

        debug!(src = %src, dst = %dst, inumber = child, "moved node");
        Ok(())
    }

    /// Resolves `path` and returns its inumber.
    pub fn lookup(&self, path: &str) -> Result<Inumber, FsError> {
        let mut locks = LockSet::new();
        resolve(
            &self.table,
            &TreePath::new(path),
            Intent::Lookup,
            &mut locks,
        )
    }

    /// Writes a depth-first pre-order dump of the tree, one node per line:
    /// `<inumber> <kind> <path>`.
    ///
    /// Runs under reader locks only, so it proceeds alongside concurrent
    /// lookups and waits out writers node by node.
    pub fn print_tree<W: io::Write>(&self, sink: &mut W) -> io::Result<()> {
        self.print_node(sink, ROOT_INUMBER, "/")
    }

    fn print_node<W: io::Write>(
        &self,
        sink: &mut W,
        inumber: Inumber,
        path: &str,
    ) -> io::Result<()> {
        let guard = self.table.slot(inumber).read();
        let Slot::InUse(node) = &*guard else {
            return Ok(());
        };
        writeln!(sink, "{inumber} {} {path}", node.kind().as_char())?;
        if let Some(entries) = node.dir() {
            for entry in entries.iter() {
                let child_path = if path == "/" {
                    format!("/{}", entry.name)
                } else {
                    format!("{path}/{}", entry.name)
                };
                self.print_node(sink, entry.inumber, &child_path)?;
            }
        }
        Ok(())
    }
}

/// Splits a path into parent path and leaf name; the root has neither.
fn split_parent_child(path: &TreePath) -> Result<(TreePath, &str), FsError> {
    path.split().ok_or_else(|| FsError::InvalidName {
        name: String::new(),
    })
}

/// Inumbers of the nodes on the locked chain from the root to `parent`,
/// root included.
fn chain(locks: &LockSet<'_>, parent: &TreePath) -> Vec<Inumber> {
    let mut out = vec![ROOT_INUMBER];
    let mut current = ROOT_INUMBER;
    for name in parent.components() {
        let Some(next) = locks.dir(current).and_then(|entries| entries.lookup(name)) else {
            break;
        };
        out.push(next);
        current = next;
    }
    out
}
