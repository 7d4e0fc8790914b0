//! Operation-based undo/redo history.
//!
//! DESIGN
//! ======
//! Each local mutation is recorded as a self-contained [`Operation`] carrying
//! enough state to run in both directions: undo applies the inverse, redo
//! re-applies the forward form. The history is a linear stack with a cursor;
//! recording while the cursor sits mid-stack truncates the redo tail, so
//! there is never a branching timeline.
//!
//! Only local mutations are recorded. Remote mutations mutate the store
//! directly and must never enter the history — undoing another user's work
//! from this client would fork the shared document.

use tracing::warn;

use crate::object::{DrawingObject, ObjectId};
use crate::store::ObjectStore;

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;

/// Maximum recorded operations; the oldest entry is dropped past this.
const MAX_HISTORY: usize = 100;

/// One reversible document mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// An object was created. Inverse: delete it.
    AddObject { object: DrawingObject },
    /// An object was deleted. Inverse: restore it.
    RemoveObject { object: DrawingObject },
    /// An object's payload changed. Both sides are full copies, so
    /// undo/redo are plain replacements.
    UpdateObject { id: ObjectId, before: DrawingObject, after: DrawingObject },
    /// A group of objects moved by one delta. Inverse: move them back.
    MoveObjects { ids: Vec<ObjectId>, dx: f64, dy: f64 },
}

/// A recorded operation plus the user who performed it.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub op: Operation,
    pub actor_user_id: Option<String>,
}

// =============================================================================
// HISTORY MANAGER
// =============================================================================

/// Linear undo/redo stack over [`Operation`]s.
#[derive(Debug, Default)]
pub struct HistoryManager {
    entries: Vec<HistoryEntry>,
    /// Number of entries currently "applied"; entries past the cursor are
    /// the redo tail.
    cursor: usize,
}

impl HistoryManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed local mutation.
    ///
    /// Discards any redo tail, then appends. The stack is capped at
    /// [`MAX_HISTORY`]; the oldest entry falls off first.
    pub fn record(&mut self, op: Operation, actor_user_id: Option<String>) {
        self.entries.truncate(self.cursor);
        self.entries.push(HistoryEntry { op, actor_user_id });
        if self.entries.len() > MAX_HISTORY {
            self.entries.remove(0);
        }
        self.cursor = self.entries.len();
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Depth of the undo side of the stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.cursor
    }

    /// Step the cursor back and apply the inverse of that entry to `store`.
    ///
    /// Returns the entry that was undone, so the caller can mirror the
    /// inverse over the network. Returns `None` when there is nothing to
    /// undo.
    pub fn undo(&mut self, store: &mut ObjectStore) -> Option<HistoryEntry> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        let entry = self.entries[self.cursor].clone();
        apply_inverse(&entry.op, store);
        Some(entry)
    }

    /// Re-apply the entry just past the cursor to `store`.
    ///
    /// Returns the entry that was redone, or `None` when the redo tail is
    /// empty.
    pub fn redo(&mut self, store: &mut ObjectStore) -> Option<HistoryEntry> {
        if self.cursor >= self.entries.len() {
            return None;
        }
        let entry = self.entries[self.cursor].clone();
        self.cursor += 1;
        apply_forward(&entry.op, store);
        Some(entry)
    }

    /// Drop all recorded history, e.g. when a server snapshot replaces the
    /// document.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

/// Apply the inverse of an operation. A missing target (deleted remotely
/// since the entry was recorded) is logged and skipped rather than failing
/// the whole undo.
fn apply_inverse(op: &Operation, store: &mut ObjectStore) {
    match op {
        Operation::AddObject { object } => {
            if store.remove(object.id).is_err() {
                warn!(id = %object.id, "undo add: object already gone");
            }
        }
        Operation::RemoveObject { object } => {
            if store.insert(object.clone()).is_err() {
                warn!(id = %object.id, "undo remove: id already present");
            }
        }
        Operation::UpdateObject { id, before, .. } => {
            if store.replace(before.clone()).is_err() {
                warn!(%id, "undo update: object missing");
            }
        }
        Operation::MoveObjects { ids, dx, dy } => {
            translate_all(store, ids, -dx, -dy);
        }
    }
}

/// Re-apply an operation in its forward direction.
fn apply_forward(op: &Operation, store: &mut ObjectStore) {
    match op {
        Operation::AddObject { object } => {
            if store.insert(object.clone()).is_err() {
                warn!(id = %object.id, "redo add: id already present");
            }
        }
        Operation::RemoveObject { object } => {
            if store.remove(object.id).is_err() {
                warn!(id = %object.id, "redo remove: object already gone");
            }
        }
        Operation::UpdateObject { id, after, .. } => {
            if store.replace(after.clone()).is_err() {
                warn!(%id, "redo update: object missing");
            }
        }
        Operation::MoveObjects { ids, dx, dy } => {
            translate_all(store, ids, *dx, *dy);
        }
    }
}

fn translate_all(store: &mut ObjectStore, ids: &[ObjectId], dx: f64, dy: f64) {
    for id in ids {
        if store.update_with(*id, |obj| obj.translate(dx, dy)).is_err() {
            warn!(%id, "move step: object missing, skipping");
        }
    }
}
