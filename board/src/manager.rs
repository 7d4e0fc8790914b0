//! Document orchestration: the one owner of store, history, selection and
//! clipboard.
//!
//! ARCHITECTURE
//! ============
//! Every mutation flows through [`ObjectManager`], which keeps four
//! subsystems consistent in a fixed order: mutate the store, record history
//! (local mutations only), prune the selection, then hand the effect to the
//! [`Broadcaster`]. Remote mutations take the same store path but skip the
//! history and the broadcast — echoing a peer's change back at the network
//! is how feedback loops start.
//!
//! The broadcaster is a seam, not a dependency: with none attached (or a
//! disconnected one) every operation completes locally and reports the
//! broadcast as not sent. That is what makes local-first startup work.

use serde_json::Value;
use tracing::{debug, warn};

use crate::geometry::{Bounds, Point};
use crate::history::{HistoryManager, Operation};
use crate::object::{DrawingObject, ObjectId, ObjectKind, ObjectPayload};
use crate::selection::{Clipboard, SelectionManager};
use crate::store::ObjectStore;

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;

/// Index probe margin for point picks; covers hit slop plus half of the
/// widest plausible stroke.
const PICK_MARGIN: f64 = 16.0;

/// Outbound effect sink. Implementations return whether the effect was
/// actually handed to a live connection.
pub trait Broadcaster: Send {
    fn object_added(&self, payload: &ObjectPayload) -> bool;
    fn object_updated(&self, payload: &ObjectPayload) -> bool;
    fn object_deleted(&self, id: ObjectId) -> bool;
}

// =============================================================================
// OBJECT MANAGER
// =============================================================================

/// Facade over the document: all reads and writes go through here.
pub struct ObjectManager {
    store: ObjectStore,
    history: HistoryManager,
    selection: SelectionManager,
    clipboard: Clipboard,
    user_id: Option<String>,
    broadcaster: Option<Box<dyn Broadcaster>>,
}

impl std::fmt::Debug for ObjectManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectManager")
            .field("objects", &self.store.len())
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl Default for ObjectManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: ObjectStore::new(),
            history: HistoryManager::new(),
            selection: SelectionManager::new(),
            clipboard: Clipboard::new(),
            user_id: None,
            broadcaster: None,
        }
    }

    /// Attach (or replace) the outbound effect sink.
    pub fn set_broadcaster(&mut self, broadcaster: Box<dyn Broadcaster>) {
        self.broadcaster = Some(broadcaster);
    }

    /// Record the authenticated user; newly created objects carry this id.
    pub fn set_user_id(&mut self, user_id: String) {
        self.user_id = Some(user_id);
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    #[must_use]
    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // =========================================================================
    // LOCAL MUTATIONS
    // =========================================================================

    /// Create a new object from this user's input.
    ///
    /// The object lands in the store immediately; whether the broadcast went
    /// out is the session layer's concern (ack tracking lives there).
    pub fn add_object(&mut self, kind: ObjectKind, data: Value) -> ObjectId {
        let object = DrawingObject::new(kind, data, self.user_id.clone());
        let id = object.id;
        // Fresh uuid, cannot collide.
        let _ = self.store.insert(object.clone());
        self.history.record(Operation::AddObject { object: object.clone() }, self.user_id.clone());
        self.broadcast_added(&object);
        id
    }

    /// Delete an object. `from_erase` marks deletes coming from an eraser
    /// pass; each erased object is still its own history entry, so an
    /// eraser stroke undoes object by object.
    ///
    /// Unknown ids are ignored: a concurrent remote delete may have won.
    pub fn remove_object(&mut self, id: ObjectId, from_erase: bool) {
        let Ok(object) = self.store.remove(id) else {
            debug!(%id, from_erase, "local remove of unknown object, ignoring");
            return;
        };
        self.selection.remove(id);
        self.history.record(Operation::RemoveObject { object }, self.user_id.clone());
        self.broadcast_deleted(id);
    }

    /// Capture an object's state before an interactive edit.
    ///
    /// Pair with [`Self::commit_edit`]; intermediate frames go through
    /// [`Self::preview_edit`] and touch neither history nor the network.
    #[must_use]
    pub fn begin_edit(&self, id: ObjectId) -> Option<DrawingObject> {
        self.store.get(id).cloned()
    }

    /// Apply an intermediate edit frame without recording or broadcasting.
    pub fn preview_edit<F>(&mut self, id: ObjectId, f: F)
    where
        F: FnOnce(&mut DrawingObject),
    {
        if self.store.update_with(id, f).is_err() {
            debug!(%id, "preview edit on unknown object, ignoring");
        }
    }

    /// Finish an interactive edit: record one history entry for the whole
    /// gesture and broadcast the final state.
    pub fn commit_edit(&mut self, before: DrawingObject) {
        let id = before.id;
        let Some(after) = self.store.get(id).cloned() else {
            debug!(%id, "commit edit on unknown object, ignoring");
            return;
        };
        if after == before {
            return;
        }
        self.history
            .record(Operation::UpdateObject { id, before, after: after.clone() }, self.user_id.clone());
        self.broadcast_updated(&after);
    }

    /// One-shot payload edit: capture, mutate, record, broadcast.
    pub fn update_object<F>(&mut self, id: ObjectId, f: F)
    where
        F: FnOnce(&mut DrawingObject),
    {
        let Some(before) = self.begin_edit(id) else {
            debug!(%id, "update of unknown object, ignoring");
            return;
        };
        self.preview_edit(id, f);
        self.commit_edit(before);
    }

    /// Move every selected object by one delta, as a single history entry.
    pub fn move_selected(&mut self, dx: f64, dy: f64) {
        let ids = self.selection.ids();
        if ids.is_empty() || (dx == 0.0 && dy == 0.0) {
            return;
        }
        for id in &ids {
            if self.store.update_with(*id, |obj| obj.translate(dx, dy)).is_err() {
                warn!(%id, "selected object vanished mid-move");
            }
        }
        self.history
            .record(Operation::MoveObjects { ids: ids.clone(), dx, dy }, self.user_id.clone());
        for id in ids {
            if let Some(object) = self.store.get(id) {
                let payload = object.to_payload();
                self.broadcast_updated_payload(&payload);
            }
        }
    }

    // =========================================================================
    // REMOTE MUTATIONS
    // =========================================================================

    /// Apply a peer's object creation. Never recorded in history.
    ///
    /// A duplicate id is ignored and reported as `None`: trusting our own
    /// copy over a replay is the conservative choice when the server echoes
    /// an add we already hold.
    pub fn add_remote_object(&mut self, payload: ObjectPayload) -> Option<ObjectId> {
        let object = DrawingObject::from_payload(payload);
        let id = object.id;
        match self.store.insert(object) {
            Ok(()) => Some(id),
            Err(_) => {
                debug!(%id, "remote add for existing object, ignoring");
                None
            }
        }
    }

    /// Apply a peer's object update. Unknown ids are dropped with a warning;
    /// the next sync snapshot will reconcile.
    pub fn update_remote_object(&mut self, payload: ObjectPayload) {
        let object = DrawingObject::from_payload(payload);
        let id = object.id;
        if self.store.replace(object).is_err() {
            warn!(%id, "remote update for unknown object, dropping");
        }
    }

    /// Apply a peer's object deletion and prune it from the selection.
    pub fn remove_remote_object(&mut self, id: ObjectId) {
        if self.store.remove(id).is_err() {
            warn!(%id, "remote delete for unknown object, dropping");
            return;
        }
        self.selection.remove(id);
    }

    /// Replace the whole document with a server snapshot. Clears history and
    /// selection: neither survives a document swap meaningfully.
    pub fn load_remote_snapshot(&mut self, objects: Vec<DrawingObject>) {
        self.store.load_snapshot(objects);
        self.history.clear();
        self.selection.clear();
    }

    // =========================================================================
    // UNDO / REDO
    // =========================================================================

    /// Undo the newest local mutation and broadcast its inverse effect.
    ///
    /// Returns `false` when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.undo(&mut self.store) else {
            return false;
        };
        self.selection.retain(|id| self.store.contains(id));
        match &entry.op {
            Operation::AddObject { object } => self.broadcast_deleted(object.id),
            Operation::RemoveObject { object } => {
                if let Some(restored) = self.store.get(object.id) {
                    let payload = restored.to_payload();
                    self.broadcast_added_payload(&payload);
                }
            }
            Operation::UpdateObject { id, .. } => self.broadcast_current(*id),
            Operation::MoveObjects { ids, .. } => {
                for id in ids {
                    self.broadcast_current(*id);
                }
            }
        }
        true
    }

    /// Re-apply the newest undone mutation and broadcast its effect.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.history.redo(&mut self.store) else {
            return false;
        };
        self.selection.retain(|id| self.store.contains(id));
        match &entry.op {
            Operation::AddObject { object } => {
                if let Some(restored) = self.store.get(object.id) {
                    let payload = restored.to_payload();
                    self.broadcast_added_payload(&payload);
                }
            }
            Operation::RemoveObject { object } => self.broadcast_deleted(object.id),
            Operation::UpdateObject { id, .. } => self.broadcast_current(*id),
            Operation::MoveObjects { ids, .. } => {
                for id in ids {
                    self.broadcast_current(*id);
                }
            }
        }
        true
    }

    // =========================================================================
    // PICKING AND SELECTION
    // =========================================================================

    /// Topmost object whose geometry contains the point, or `None`.
    #[must_use]
    pub fn get_object_at(&self, p: Point) -> Option<ObjectId> {
        let probe = Bounds::at_point(p).inflated(PICK_MARGIN);
        self.store
            .query_rect(&probe)
            .into_iter()
            .rev() // front to back
            .find(|id| self.store.get(*id).is_some_and(|obj| obj.contains_point(p)))
    }

    /// Select the objects intersecting a marquee rectangle. With `multi`
    /// the hits are unioned into the current selection (shift-drag);
    /// otherwise they replace it.
    pub fn select_objects_in_rect(&mut self, rect: &Bounds, multi: bool) {
        let mut ids = self.store.query_rect(rect);
        if multi {
            for prev in self.selection.ids() {
                if !ids.contains(&prev) {
                    ids.push(prev);
                }
            }
        }
        self.set_selection(ids);
    }

    /// Replace the selection, mirroring the transient flags on the objects.
    pub fn set_selection(&mut self, ids: Vec<ObjectId>) {
        for prev in self.selection.ids() {
            self.set_selected_flag(prev, false);
        }
        let ids: Vec<ObjectId> = ids.into_iter().filter(|id| self.store.contains(*id)).collect();
        for id in &ids {
            self.set_selected_flag(*id, true);
        }
        self.selection.set(ids);
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(Vec::new());
    }

    /// Shift-click style toggle.
    pub fn toggle_selected(&mut self, id: ObjectId) {
        if !self.store.contains(id) {
            return;
        }
        let now_selected = !self.selection.contains(id);
        self.set_selected_flag(id, now_selected);
        self.selection.toggle(id);
    }

    fn set_selected_flag(&mut self, id: ObjectId, selected: bool) {
        // Selection does not change bounds; update_with keeps the index pass
        // harmless.
        let _ = self.store.update_with(id, |obj| obj.selected = selected);
    }

    // =========================================================================
    // CLIPBOARD
    // =========================================================================

    /// Copy the current selection, in z-order, into the clipboard.
    pub fn copy_selection(&mut self) {
        let selected: Vec<DrawingObject> = self
            .store
            .iter_z_order()
            .filter(|obj| self.selection.contains(obj.id))
            .cloned()
            .collect();
        self.clipboard.copy(selected);
    }

    /// Paste clipboard contents as fresh objects, selecting the copies.
    ///
    /// Each pasted object is recorded and broadcast like any other local
    /// add, so a single undo removes one paste batch object by object.
    pub fn paste(&mut self) -> Vec<ObjectId> {
        let pasted = self.clipboard.paste();
        let mut ids = Vec::with_capacity(pasted.len());
        for mut object in pasted {
            object.owner_user_id = self.user_id.clone();
            let _ = self.store.insert(object.clone());
            self.history
                .record(Operation::AddObject { object: object.clone() }, self.user_id.clone());
            self.broadcast_added(&object);
            ids.push(object.id);
        }
        self.set_selection(ids.clone());
        ids
    }

    // =========================================================================
    // MIGRATION
    // =========================================================================

    /// Re-own every object drawn before authentication and return the full
    /// document for re-broadcast.
    ///
    /// Used when a local-first session comes online: objects created offline
    /// carry no owner until the server hands out a user id.
    pub fn rehome_local_objects(&mut self, new_user_id: &str) -> Vec<DrawingObject> {
        self.user_id = Some(new_user_id.to_owned());
        let unowned: Vec<ObjectId> = self
            .store
            .iter_z_order()
            .filter(|obj| obj.owner_user_id.is_none())
            .map(|obj| obj.id)
            .collect();
        for id in unowned {
            let _ = self.store.update_with(id, |obj| {
                obj.owner_user_id = Some(new_user_id.to_owned());
            });
        }
        self.store.snapshot()
    }

    // =========================================================================
    // BROADCAST HELPERS
    // =========================================================================

    fn broadcast_added(&self, object: &DrawingObject) {
        let payload = object.to_payload();
        self.broadcast_added_payload(&payload);
    }

    fn broadcast_added_payload(&self, payload: &ObjectPayload) {
        if let Some(b) = &self.broadcaster {
            if !b.object_added(payload) {
                debug!(id = %payload.id, "add kept local, no live connection");
            }
        }
    }

    fn broadcast_updated(&self, object: &DrawingObject) {
        let payload = object.to_payload();
        self.broadcast_updated_payload(&payload);
    }

    fn broadcast_updated_payload(&self, payload: &ObjectPayload) {
        if let Some(b) = &self.broadcaster {
            if !b.object_updated(payload) {
                debug!(id = %payload.id, "update kept local, no live connection");
            }
        }
    }

    fn broadcast_current(&self, id: ObjectId) {
        if let Some(object) = self.store.get(id) {
            self.broadcast_updated(object);
        } else {
            debug!(%id, "skipping broadcast for object no longer present");
        }
    }

    fn broadcast_deleted(&self, id: ObjectId) {
        if let Some(b) = &self.broadcaster {
            if !b.object_deleted(id) {
                debug!(%id, "delete kept local, no live connection");
            }
        }
    }
}
