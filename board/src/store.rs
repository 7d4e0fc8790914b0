//! Object storage with z-order and a synchronized spatial index.
//!
//! ARCHITECTURE
//! ============
//! The store is the single owner of document state. Three structures move in
//! lockstep:
//!
//! - `objects` — id to object, the authoritative copy
//! - `z_order` — paint order, back to front
//! - `index` — quadtree over current bounds
//!
//! Every mutation goes through the store so the index can be maintained with
//! the remove-then-reinsert discipline: geometry changes remove the entry at
//! the old bounds before the object is touched, then reinsert at the new
//! bounds. Callers never update the index directly.

use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

use crate::geometry::Bounds;
use crate::object::{DrawingObject, ObjectId};
use crate::quadtree::SpatialIndex;

/// Store-level failures, surfaced with grepable codes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("E_OBJECT_NOT_FOUND: no object with id {0}")]
    NotFound(ObjectId),

    #[error("E_DUPLICATE_ID: object {0} already exists")]
    DuplicateId(ObjectId),
}

// =============================================================================
// OBJECT STORE
// =============================================================================

/// Owner of all drawing objects in a document.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: HashMap<ObjectId, DrawingObject>,
    z_order: Vec<ObjectId>,
    index: SpatialIndex,
}

impl ObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&DrawingObject> {
        self.objects.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Insert a new object at the top of the z-order.
    ///
    /// # Errors
    /// Returns [`StoreError::DuplicateId`] if the id is already present.
    pub fn insert(&mut self, object: DrawingObject) -> Result<(), StoreError> {
        if self.objects.contains_key(&object.id) {
            return Err(StoreError::DuplicateId(object.id));
        }
        self.index.insert(object.id, object.bounds());
        self.z_order.push(object.id);
        self.objects.insert(object.id, object);
        Ok(())
    }

    /// Remove an object, returning it.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the id is unknown.
    pub fn remove(&mut self, id: ObjectId) -> Result<DrawingObject, StoreError> {
        let object = self.objects.remove(&id).ok_or(StoreError::NotFound(id))?;
        if !self.index.remove(id, object.bounds()) {
            // Index out of sync with the map: recoverable, but worth noticing.
            warn!(%id, "object missing from spatial index on remove");
        }
        self.z_order.retain(|z| *z != id);
        Ok(object)
    }

    /// Mutate an object through a closure, keeping the index consistent.
    ///
    /// The entry is pulled from the index at the pre-mutation bounds and
    /// reinserted at the post-mutation bounds, so the closure is free to
    /// change any geometry.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the id is unknown.
    pub fn update_with<F>(&mut self, id: ObjectId, f: F) -> Result<&DrawingObject, StoreError>
    where
        F: FnOnce(&mut DrawingObject),
    {
        let object = self.objects.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let old_bounds = object.bounds();
        f(object);
        let new_bounds = object.bounds();
        if !self.index.update(id, old_bounds, new_bounds) {
            warn!(%id, "object missing from spatial index on update");
            self.index.insert(id, new_bounds);
        }
        Ok(&self.objects[&id])
    }

    /// Replace an object's payload wholesale (remote update path).
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the id is unknown.
    pub fn replace(&mut self, incoming: DrawingObject) -> Result<(), StoreError> {
        let id = incoming.id;
        self.update_with(id, |obj| {
            obj.kind = incoming.kind;
            obj.data = incoming.data;
            obj.owner_user_id = incoming.owner_user_id;
        })?;
        Ok(())
    }

    /// Ids of objects whose bounds intersect `rect`, in z-order (back to
    /// front). The index answers coarsely; callers needing exact hits refine
    /// with [`DrawingObject::contains_point`].
    #[must_use]
    pub fn query_rect(&self, rect: &Bounds) -> Vec<ObjectId> {
        let hits = self.index.query(rect);
        self.z_order.iter().copied().filter(|id| hits.contains(id)).collect()
    }

    /// All objects in z-order, back to front.
    pub fn iter_z_order(&self) -> impl Iterator<Item = &DrawingObject> {
        self.z_order.iter().filter_map(|id| self.objects.get(id))
    }

    /// Move an object to the top of the paint order.
    pub fn bring_to_front(&mut self, id: ObjectId) {
        if self.objects.contains_key(&id) {
            self.z_order.retain(|z| *z != id);
            self.z_order.push(id);
        }
    }

    /// Replace the whole document with a server snapshot.
    ///
    /// Duplicate ids within the snapshot keep the last occurrence, matching
    /// how a replayed event log would resolve.
    pub fn load_snapshot(&mut self, objects: Vec<DrawingObject>) {
        self.objects.clear();
        self.z_order.clear();
        self.index = SpatialIndex::new();
        for object in objects {
            if self.objects.contains_key(&object.id) {
                warn!(id = %object.id, "duplicate id in snapshot, keeping last");
                self.z_order.retain(|z| *z != object.id);
                if let Some(prev) = self.objects.remove(&object.id) {
                    self.index.remove(prev.id, prev.bounds());
                }
            }
            self.index.insert(object.id, object.bounds());
            self.z_order.push(object.id);
            self.objects.insert(object.id, object);
        }
    }

    /// Clone of every object in z-order, for snapshots and migration.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DrawingObject> {
        self.iter_z_order().cloned().collect()
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
