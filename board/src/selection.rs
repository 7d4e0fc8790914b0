//! Selection set and clipboard.
//!
//! Selection is an id-set mirrored onto each object's transient `selected`
//! flag by the manager; the clipboard holds deep copies so pasted objects
//! are unaffected by later edits or deletions of the originals.

use std::collections::HashSet;

use crate::object::{DrawingObject, ObjectId};

/// Offset applied to each paste so copies do not land exactly on their
/// source.
pub const PASTE_OFFSET: f64 = 12.0;

/// The set of currently selected object ids.
#[derive(Debug, Default)]
pub struct SelectionManager {
    ids: HashSet<ObjectId>,
}

impl SelectionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains(&id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Selected ids in arbitrary order.
    #[must_use]
    pub fn ids(&self) -> Vec<ObjectId> {
        self.ids.iter().copied().collect()
    }

    pub fn add(&mut self, id: ObjectId) {
        self.ids.insert(id);
    }

    pub fn remove(&mut self, id: ObjectId) -> bool {
        self.ids.remove(&id)
    }

    /// Flip membership; used for shift-click.
    pub fn toggle(&mut self, id: ObjectId) {
        if !self.ids.insert(id) {
            self.ids.remove(&id);
        }
    }

    /// Replace the selection wholesale.
    pub fn set(&mut self, ids: impl IntoIterator<Item = ObjectId>) {
        self.ids = ids.into_iter().collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop ids no longer present in the document.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(ObjectId) -> bool,
    {
        self.ids.retain(|id| keep(*id));
    }
}

// =============================================================================
// CLIPBOARD
// =============================================================================

/// Holds copies of objects between copy and paste.
#[derive(Debug, Default)]
pub struct Clipboard {
    objects: Vec<DrawingObject>,
    /// Number of pastes since the last copy; each paste offsets further so
    /// repeated pastes fan out instead of stacking.
    paste_count: u32,
}

impl Clipboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Store deep copies of `objects`, resetting the paste counter.
    pub fn copy(&mut self, objects: Vec<DrawingObject>) {
        if objects.is_empty() {
            return;
        }
        self.objects = objects;
        self.paste_count = 0;
    }

    /// Produce paste-ready clones: fresh ids, offset geometry, cleared
    /// selection flags. Returns an empty vec when the clipboard is empty.
    #[must_use]
    pub fn paste(&mut self) -> Vec<DrawingObject> {
        if self.objects.is_empty() {
            return Vec::new();
        }
        self.paste_count += 1;
        let offset = PASTE_OFFSET * f64::from(self.paste_count);
        self.objects
            .iter()
            .map(|source| {
                let mut copy = DrawingObject::new(
                    source.kind,
                    source.data.clone(),
                    source.owner_user_id.clone(),
                );
                copy.translate(offset, offset);
                copy
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKind;
    use serde_json::json;

    fn rect() -> DrawingObject {
        DrawingObject::new(
            ObjectKind::Rectangle,
            json!({"x": 0.0, "y": 0.0, "width": 10.0, "height": 10.0}),
            None,
        )
    }

    #[test]
    fn toggle_flips_membership() {
        let mut sel = SelectionManager::new();
        let id = uuid::Uuid::new_v4();
        sel.toggle(id);
        assert!(sel.contains(id));
        sel.toggle(id);
        assert!(!sel.contains(id));
    }

    #[test]
    fn set_replaces_previous_selection() {
        let mut sel = SelectionManager::new();
        let old = uuid::Uuid::new_v4();
        let new = uuid::Uuid::new_v4();
        sel.add(old);
        sel.set([new]);
        assert!(!sel.contains(old));
        assert!(sel.contains(new));
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn retain_prunes_stale_ids() {
        let mut sel = SelectionManager::new();
        let keep = uuid::Uuid::new_v4();
        let stale = uuid::Uuid::new_v4();
        sel.add(keep);
        sel.add(stale);
        sel.retain(|id| id == keep);
        assert_eq!(sel.ids(), vec![keep]);
    }

    #[test]
    fn paste_assigns_fresh_ids_and_offsets() {
        let mut clip = Clipboard::new();
        let source = rect();
        clip.copy(vec![source.clone()]);

        let pasted = clip.paste();
        assert_eq!(pasted.len(), 1);
        assert_ne!(pasted[0].id, source.id);
        assert!(!pasted[0].selected);
        let b = pasted[0].bounds();
        assert_eq!((b.x, b.y), (PASTE_OFFSET, PASTE_OFFSET));
    }

    #[test]
    fn repeated_paste_fans_out() {
        let mut clip = Clipboard::new();
        clip.copy(vec![rect()]);

        let first = clip.paste();
        let second = clip.paste();
        assert_eq!(first[0].bounds().x, PASTE_OFFSET);
        assert_eq!(second[0].bounds().x, PASTE_OFFSET * 2.0);
        assert_ne!(first[0].id, second[0].id);
    }

    #[test]
    fn copy_of_nothing_keeps_previous_contents() {
        let mut clip = Clipboard::new();
        clip.copy(vec![rect()]);
        clip.copy(Vec::new());
        assert!(!clip.is_empty());
    }

    #[test]
    fn paste_from_empty_clipboard_is_empty() {
        let mut clip = Clipboard::new();
        assert!(clip.paste().is_empty());
    }
}
