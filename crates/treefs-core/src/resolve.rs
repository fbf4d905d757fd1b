//! Path resolution with hand-over-hand locking.
//!
//! Walks start at the root and acquire locks strictly in root-to-leaf order
//! along the path, which puts all resolvers into one partial order (tree
//! pre-order) and rules out deadlock between walks on any two paths.
//! Ancestor locks stay held for the whole traversal: the caller's lock set
//! keeps them until the operation finishes.

use tracing::trace;

use crate::error::FsError;
use crate::inode::{InodeTable, Inumber, ROOT_INUMBER};
use crate::lock_set::{LockSet, SlotGuard};
use crate::path::TreePath;

/// Why a path is being resolved. Decides the lock mode of the terminal node:
/// writer for `Create` and `Delete`, reader for `Lookup`. Rename has its own
/// two-path walk, [`resolve_rename_parents`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Intent {
    Lookup,
    Create,
    Delete,
}

impl Intent {
    fn write_locks_terminal(self) -> bool {
        matches!(self, Intent::Create | Intent::Delete)
    }
}

/// Walks `path` from the root, appending each acquired lock to `locks`.
///
/// Interior nodes are reader-locked; the terminal node's mode follows the
/// intent. On a missing component the walk stops with `NotFound`; locks
/// acquired so far stay in `locks`, and the caller's set releases them on
/// unwind.
pub(crate) fn resolve<'t>(
    table: &'t InodeTable,
    path: &TreePath,
    intent: Intent,
    locks: &mut LockSet<'t>,
) -> Result<Inumber, FsError> {
    let names: Vec<&str> = path.components().collect();
    trace!(path = %path, ?intent, depth = names.len(), "resolving");

    let root_write = names.is_empty() && intent.write_locks_terminal();
    lock_node(table, locks, ROOT_INUMBER, root_write);

    let mut current = ROOT_INUMBER;
    for (depth, name) in names.iter().enumerate() {
        let terminal = depth + 1 == names.len();
        current = step(
            table,
            locks,
            current,
            name,
            terminal && intent.write_locks_terminal(),
            path,
        )?;
    }
    Ok(current)
}

/// Locks both parent chains of a rename in one root-to-leaf descent.
///
/// The union of the two chains is walked exactly once: the shared prefix,
/// then the source remainder, then the destination remainder. Each chain's
/// terminal (a parent directory about to be rewritten) gets a writer lock,
/// even when it sits in the middle of the other chain; every other node
/// gets a reader lock. Which positions are terminals is known from the
/// component lists before the first lock is taken, so acquisition never has
/// to turn around and go back up the tree.
///
/// Returns `(source parent, destination parent)`; with equal paths both are
/// the same inumber and the single terminal is writer-locked once.
pub(crate) fn resolve_rename_parents<'t>(
    table: &'t InodeTable,
    src_parent: &TreePath,
    dst_parent: &TreePath,
    locks: &mut LockSet<'t>,
) -> Result<(Inumber, Inumber), FsError> {
    let src: Vec<&str> = src_parent.components().collect();
    let dst: Vec<&str> = dst_parent.components().collect();
    let shared = src
        .iter()
        .zip(dst.iter())
        .take_while(|(a, b)| a == b)
        .count();
    trace!(src = %src_parent, dst = %dst_parent, shared, "resolving rename parents");

    lock_node(table, locks, ROOT_INUMBER, src.is_empty() || dst.is_empty());

    // Shared prefix. A chain that ends inside the prefix makes that node a
    // writer target while the walk continues through it.
    let mut fork = ROOT_INUMBER;
    for depth in 1..=shared {
        let write = depth == src.len() || depth == dst.len();
        fork = step(table, locks, fork, src[depth - 1], write, src_parent)?;
    }

    let mut src_dir = fork;
    for depth in shared + 1..=src.len() {
        let write = depth == src.len();
        src_dir = step(table, locks, src_dir, src[depth - 1], write, src_parent)?;
    }

    let mut dst_dir = fork;
    for depth in shared + 1..=dst.len() {
        let write = depth == dst.len();
        dst_dir = step(table, locks, dst_dir, dst[depth - 1], write, dst_parent)?;
    }

    Ok((src_dir, dst_dir))
}

/// Moves one level down from `from`, locking the child it finds.
fn step<'t>(
    table: &'t InodeTable,
    locks: &mut LockSet<'t>,
    from: Inumber,
    name: &str,
    write: bool,
    err_path: &TreePath,
) -> Result<Inumber, FsError> {
    let next = locks
        .dir(from)
        .and_then(|entries| entries.lookup(name))
        .ok_or_else(|| FsError::NotFound {
            path: err_path.to_string(),
        })?;
    lock_node(table, locks, next, write);
    Ok(next)
}

fn lock_node<'t>(table: &'t InodeTable, locks: &mut LockSet<'t>, inumber: Inumber, write: bool) {
    if locks.contains(inumber) {
        return;
    }
    let guard = if write {
        SlotGuard::Write(table.slot(inumber).write())
    } else {
        SlotGuard::Read(table.slot(inumber).read())
    };
    locks.push(inumber, guard);
}
