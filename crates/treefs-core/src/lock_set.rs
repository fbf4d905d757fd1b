//! Bookkeeping for the locks an operation holds.
//!
//! Every operation owns exactly one [`LockSet`] for its whole lifetime. The
//! resolver appends guards in acquisition (root-to-leaf) order; dropping the
//! set releases them in reverse order on every return path, success or error.

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::inode::{DirEntries, Inumber, Node, Slot};

/// A held slot lock, reader or writer.
pub(crate) enum SlotGuard<'t> {
    Read(RwLockReadGuard<'t, Slot>),
    Write(RwLockWriteGuard<'t, Slot>),
}

impl SlotGuard<'_> {
    fn slot(&self) -> &Slot {
        match self {
            SlotGuard::Read(guard) => guard,
            SlotGuard::Write(guard) => guard,
        }
    }

    fn slot_mut(&mut self) -> Option<&mut Slot> {
        match self {
            SlotGuard::Write(guard) => Some(&mut *guard),
            SlotGuard::Read(_) => None,
        }
    }
}

/// Ordered collection of held locks, keyed by inumber.
///
/// The set never holds the same inumber twice: the resolver checks
/// [`LockSet::contains`] before acquiring, which is what lets the two-path
/// rename lock a shared ancestor chain only once.
#[derive(Default)]
pub(crate) struct LockSet<'t> {
    held: Vec<(Inumber, SlotGuard<'t>)>,
}

impl<'t> LockSet<'t> {
    pub fn new() -> Self {
        Self { held: Vec::new() }
    }

    pub fn contains(&self, inumber: Inumber) -> bool {
        self.held.iter().any(|(held, _)| *held == inumber)
    }

    /// Appends a guard. The caller is responsible for acquisition order.
    pub fn push(&mut self, inumber: Inumber, guard: SlotGuard<'t>) {
        debug_assert!(!self.contains(inumber), "inumber locked twice");
        self.held.push((inumber, guard));
    }

    /// The node behind a held lock, if the slot is in use.
    pub fn node(&self, inumber: Inumber) -> Option<&Node> {
        self.held
            .iter()
            .find(|(held, _)| *held == inumber)
            .and_then(|(_, guard)| guard.slot().node())
    }

    /// The entry array of a held directory.
    pub fn dir(&self, inumber: Inumber) -> Option<&DirEntries> {
        self.node(inumber).and_then(Node::dir)
    }

    /// Mutable entry array of a held directory; requires a writer guard.
    pub fn dir_mut(&mut self, inumber: Inumber) -> Option<&mut DirEntries> {
        self.held
            .iter_mut()
            .find(|(held, _)| *held == inumber)
            .and_then(|(_, guard)| guard.slot_mut())
            .and_then(Slot::node_mut)
            .and_then(Node::dir_mut)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.held.len()
    }
}

impl Drop for LockSet<'_> {
    fn drop(&mut self) {
        // reverse acquisition order
        while self.held.pop().is_some() {}
    }
}
