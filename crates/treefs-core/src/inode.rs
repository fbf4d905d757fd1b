//! The inode table: a fixed-capacity pool of node slots.
//!
//! Every slot carries its own [`parking_lot::RwLock`]. The lock belongs to
//! the slot, not to the node stored in it: it outlives any individual node
//! and is only destroyed with the table itself, so a lock acquired just as
//! its node is freed still unlocks safely.
//!
//! The table has no global lock. Allocation claims a slot under that slot's
//! own writer lock, and all other mutation happens through guards the caller
//! obtained from [`InodeTable::slot`] while walking the tree.

use std::fmt;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::trace;

use crate::limits::{INODE_TABLE_SIZE, MAX_DIR_ENTRIES};

/// Index of a slot in the table, stable for the lifetime of the node in it.
pub type Inumber = usize;

/// The root directory's inumber. Allocated at table construction, never freed.
pub const ROOT_INUMBER: Inumber = 0;

/// What a node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

impl NodeKind {
    /// Single-character tag used in tree dumps (`f` / `d`).
    pub fn as_char(self) -> char {
        match self {
            NodeKind::File => 'f',
            NodeKind::Directory => 'd',
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::File => "file",
            NodeKind::Directory => "directory",
        })
    }
}

/// One `(name, inumber)` pair inside a directory payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub inumber: Inumber,
}

/// Rejected [`DirEntries::insert`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InsertError {
    /// An entry with this name is already present.
    #[error("name already present")]
    Duplicate,
    /// Every entry cell is in use.
    #[error("no free directory entries")]
    Full,
}

/// Fixed-width entry array embedded in every directory node.
///
/// Callers mutate entries only while holding the owning slot's writer lock;
/// the type itself is plain data and does no locking.
#[derive(Debug)]
pub struct DirEntries {
    cells: Box<[Option<DirEntry>]>,
}

impl DirEntries {
    fn new() -> Self {
        Self {
            cells: vec![None; MAX_DIR_ENTRIES].into_boxed_slice(),
        }
    }

    /// Finds the inumber filed under `name`.
    pub fn lookup(&self, name: &str) -> Option<Inumber> {
        self.iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.inumber)
    }

    /// Fills the first free cell with `(name, inumber)`.
    pub fn insert(&mut self, name: &str, inumber: Inumber) -> Result<(), InsertError> {
        if self.lookup(name).is_some() {
            return Err(InsertError::Duplicate);
        }
        let Some(cell) = self.cells.iter_mut().find(|cell| cell.is_none()) else {
            return Err(InsertError::Full);
        };
        *cell = Some(DirEntry {
            name: name.to_string(),
            inumber,
        });
        Ok(())
    }

    /// Frees the cell holding `inumber`. Returns whether a cell was freed.
    pub fn remove(&mut self, inumber: Inumber) -> bool {
        for cell in &mut self.cells {
            if cell.as_ref().is_some_and(|entry| entry.inumber == inumber) {
                *cell = None;
                return true;
            }
        }
        false
    }

    /// True iff every cell is free.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    /// Number of entries in use.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Iterates the entries in cell order.
    pub fn iter(&self) -> impl Iterator<Item = &DirEntry> {
        self.cells.iter().flatten()
    }
}

/// A live filesystem node.
#[derive(Debug)]
pub enum Node {
    /// Opaque byte region; reserved, no current operation touches it.
    File { data: Vec<u8> },
    Directory { entries: DirEntries },
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        match kind {
            NodeKind::File => Node::File { data: Vec::new() },
            NodeKind::Directory => Node::Directory {
                entries: DirEntries::new(),
            },
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::File { .. } => NodeKind::File,
            Node::Directory { .. } => NodeKind::Directory,
        }
    }

    /// The entry array, if this node is a directory.
    pub fn dir(&self) -> Option<&DirEntries> {
        match self {
            Node::Directory { entries } => Some(entries),
            Node::File { .. } => None,
        }
    }

    pub fn dir_mut(&mut self) -> Option<&mut DirEntries> {
        match self {
            Node::Directory { entries } => Some(entries),
            Node::File { .. } => None,
        }
    }
}

/// State of one table slot.
#[derive(Debug)]
pub enum Slot {
    Free,
    InUse(Node),
}

impl Slot {
    pub fn is_free(&self) -> bool {
        matches!(self, Slot::Free)
    }

    pub fn node(&self) -> Option<&Node> {
        match self {
            Slot::InUse(node) => Some(node),
            Slot::Free => None,
        }
    }

    pub fn node_mut(&mut self) -> Option<&mut Node> {
        match self {
            Slot::InUse(node) => Some(node),
            Slot::Free => None,
        }
    }
}

/// Fixed-capacity pool of node slots with per-slot reader/writer locks.
#[derive(Debug)]
pub struct InodeTable {
    slots: Vec<RwLock<Slot>>,
}

impl InodeTable {
    /// Builds a table with the default capacity and the root directory in
    /// slot [`ROOT_INUMBER`].
    pub fn new() -> Self {
        Self::with_capacity(INODE_TABLE_SIZE)
    }

    /// Builds a table with `capacity` slots (at least one, for the root).
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "table needs at least the root slot");
        let slots = (0..capacity)
            .map(|inumber| {
                RwLock::new(if inumber == ROOT_INUMBER {
                    Slot::InUse(Node::new(NodeKind::Directory))
                } else {
                    Slot::Free
                })
            })
            .collect();
        Self { slots }
    }

    /// Total number of slots, free or not.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The lock guarding slot `inumber`.
    ///
    /// # Panics
    ///
    /// Panics if `inumber` is out of range. Inumbers handed out by this table
    /// are always in range; an out-of-range index is a corrupted invariant.
    pub fn slot(&self, inumber: Inumber) -> &RwLock<Slot> {
        &self.slots[inumber]
    }

    /// Claims the first free slot for a new node of `kind`.
    ///
    /// The claim happens under the slot's own writer lock, so two concurrent
    /// allocators can never obtain the same slot. Slots whose lock is
    /// currently contended are skipped: a held lock means the slot is either
    /// in use as a tree node or being claimed by another allocator.
    pub fn alloc(&self, kind: NodeKind) -> Result<Inumber, crate::FsError> {
        for (inumber, slot) in self.slots.iter().enumerate() {
            let Some(mut guard) = slot.try_write() else {
                continue;
            };
            if guard.is_free() {
                *guard = Slot::InUse(Node::new(kind));
                trace!(inumber, kind = %kind, "allocated inode");
                return Ok(inumber);
            }
        }
        Err(crate::FsError::TableFull)
    }

    /// Clears slot `inumber` and marks it free. Returns whether a node was
    /// actually freed; the root refuses to be freed.
    pub fn free(&self, inumber: Inumber) -> bool {
        if inumber == ROOT_INUMBER {
            return false;
        }
        let mut guard = self.slots[inumber].write();
        if guard.is_free() {
            return false;
        }
        *guard = Slot::Free;
        trace!(inumber, "freed inode");
        true
    }

    /// Number of slots currently in use.
    pub fn in_use(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| !slot.read().is_free())
            .count()
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_root_exists() {
        let table = InodeTable::new();
        let guard = table.slot(ROOT_INUMBER).read();
        let node = guard.node().unwrap();
        assert_eq!(node.kind(), NodeKind::Directory);
        assert!(node.dir().unwrap().is_empty());
    }

    #[test]
    fn test_alloc_returns_first_free() {
        let table = InodeTable::new();
        assert_eq!(table.alloc(NodeKind::File).unwrap(), 1);
        assert_eq!(table.alloc(NodeKind::Directory).unwrap(), 2);
        assert!(table.free(1));
        // the freed slot is recycled before untouched ones
        assert_eq!(table.alloc(NodeKind::File).unwrap(), 1);
    }

    #[test]
    fn test_alloc_exhausts() {
        let table = InodeTable::with_capacity(3);
        assert!(table.alloc(NodeKind::File).is_ok());
        assert!(table.alloc(NodeKind::File).is_ok());
        assert_eq!(
            table.alloc(NodeKind::File),
            Err(crate::FsError::TableFull)
        );
    }

    #[test]
    fn test_free_root_refused() {
        let table = InodeTable::new();
        assert!(!table.free(ROOT_INUMBER));
        assert!(!table.slot(ROOT_INUMBER).read().is_free());
    }

    #[test]
    fn test_free_clears_payload() {
        let table = InodeTable::new();
        let dir = table.alloc(NodeKind::Directory).unwrap();
        table
            .slot(dir)
            .write()
            .node_mut()
            .unwrap()
            .dir_mut()
            .unwrap()
            .insert("child", 7)
            .unwrap();
        assert!(table.free(dir));
        assert!(!table.free(dir));
        // the recycled slot starts from a clean payload
        let again = table.alloc(NodeKind::Directory).unwrap();
        assert_eq!(again, dir);
        assert!(table.slot(again).read().node().unwrap().dir().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_alloc_unique() {
        let table = Arc::new(InodeTable::new());
        let mut handles = vec![];
        for _ in 0..10 {
            let table = Arc::clone(&table);
            handles.push(thread::spawn(move || {
                table.alloc(NodeKind::File).unwrap()
            }));
        }
        let mut inumbers: Vec<Inumber> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        inumbers.sort_unstable();
        inumbers.dedup();
        assert_eq!(inumbers.len(), 10);
        assert_eq!(table.in_use(), 11); // root + 10 files
    }

    #[test]
    fn test_entries_insert_and_lookup() {
        let mut entries = DirEntries::new();
        entries.insert("a", 3).unwrap();
        entries.insert("b", 4).unwrap();
        assert_eq!(entries.lookup("a"), Some(3));
        assert_eq!(entries.lookup("b"), Some(4));
        assert_eq!(entries.lookup("c"), None);
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_entries_reject_duplicate() {
        let mut entries = DirEntries::new();
        entries.insert("a", 3).unwrap();
        assert_eq!(entries.insert("a", 9), Err(InsertError::Duplicate));
    }

    #[test]
    fn test_entries_fill_up() {
        let mut entries = DirEntries::new();
        for i in 0..MAX_DIR_ENTRIES {
            entries.insert(&format!("n{i}"), i).unwrap();
        }
        assert_eq!(entries.insert("overflow", 99), Err(InsertError::Full));
        // removal opens a cell again
        assert!(entries.remove(0));
        entries.insert("overflow", 99).unwrap();
    }

    #[test]
    fn test_entries_remove() {
        let mut entries = DirEntries::new();
        entries.insert("a", 3).unwrap();
        assert!(entries.remove(3));
        assert!(!entries.remove(3));
        assert!(entries.is_empty());
    }
}
