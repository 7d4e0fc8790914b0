//! Quadtree spatial index over object bounds.
//!
//! DESIGN
//! ======
//! Recursive quadrant subdivision with a per-node capacity. When a leaf
//! exceeds capacity it splits into four children and redistributes; an entry
//! whose bounds span more than one quadrant stays at the owning ancestor
//! node. Queries may return false positives (an entry whose stored bounds
//! merely touch the probe rect) but never false negatives.
//!
//! Removal descends guided by the entry's bounds — the same path insertion
//! took — rather than scanning the whole tree, keeping amortized cost
//! sub-linear. Empty leaf quadruples are collapsed after removal; that is an
//! occupancy optimization, not a correctness requirement.

use crate::geometry::Bounds;
use crate::object::ObjectId;

#[cfg(test)]
#[path = "quadtree_test.rs"]
mod tests;

/// Entries a node holds before splitting.
const NODE_CAPACITY: usize = 8;

/// Subdivision limit; beyond this depth nodes grow without splitting.
const MAX_DEPTH: usize = 8;

/// Half-extent of the root cell. Bounds outside it are held at the root
/// under the spanning rule.
const WORLD_HALF_EXTENT: f64 = 1_048_576.0;

/// One object's last-known bounds, cached inside the tree.
#[derive(Debug, Clone, Copy)]
struct Entry {
    id: ObjectId,
    bounds: Bounds,
}

#[derive(Debug)]
struct Node {
    bounds: Bounds,
    depth: usize,
    entries: Vec<Entry>,
    children: Option<Box<[Node; 4]>>,
}

/// Spatial index answering "which objects overlap this rectangle".
///
/// Invariant (owned by the store): every object currently stored has exactly
/// one entry here, positioned at its current bounds.
#[derive(Debug)]
pub struct SpatialIndex {
    root: Node,
    len: usize,
}

impl SpatialIndex {
    /// Create an empty index covering the whole usable world.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::new(
                Bounds::new(
                    -WORLD_HALF_EXTENT,
                    -WORLD_HALF_EXTENT,
                    WORLD_HALF_EXTENT * 2.0,
                    WORLD_HALF_EXTENT * 2.0,
                ),
                0,
            ),
            len: 0,
        }
    }

    /// Associate an object with its bounds.
    pub fn insert(&mut self, id: ObjectId, bounds: Bounds) {
        self.root.insert(Entry { id, bounds });
        self.len += 1;
    }

    /// Remove the association recorded at exactly `bounds`.
    ///
    /// Returns `false` if no entry for `id` exists on the bounds-guided
    /// path — which indicates a violated index invariant upstream.
    pub fn remove(&mut self, id: ObjectId, bounds: Bounds) -> bool {
        let removed = self.root.remove(id, &bounds);
        if removed {
            self.len -= 1;
        }
        removed
    }

    /// Atomic bounds change: remove at the old position, reinsert at the new.
    pub fn update(&mut self, id: ObjectId, old_bounds: Bounds, new_bounds: Bounds) -> bool {
        if !self.remove(id, old_bounds) {
            return false;
        }
        self.insert(id, new_bounds);
        true
    }

    /// All objects whose stored bounds intersect `rect`.
    #[must_use]
    pub fn query(&self, rect: &Bounds) -> Vec<ObjectId> {
        let mut out = Vec::new();
        self.root.query(rect, &mut out);
        out
    }

    /// Number of entries in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl Node {
    fn new(bounds: Bounds, depth: usize) -> Self {
        Self { bounds, depth, entries: Vec::new(), children: None }
    }

    fn insert(&mut self, entry: Entry) {
        if let Some(children) = &mut self.children {
            if let Some(child) = children.iter_mut().find(|c| c.bounds.contains(&entry.bounds)) {
                child.insert(entry);
                return;
            }
            // Spans multiple quadrants: owned by this ancestor.
            self.entries.push(entry);
            return;
        }

        self.entries.push(entry);
        if self.entries.len() > NODE_CAPACITY && self.depth < MAX_DEPTH {
            self.split();
        }
    }

    fn split(&mut self) {
        let half_w = self.bounds.width / 2.0;
        let half_h = self.bounds.height / 2.0;
        let (x, y) = (self.bounds.x, self.bounds.y);
        let depth = self.depth + 1;
        let mut children = Box::new([
            Node::new(Bounds::new(x, y, half_w, half_h), depth),
            Node::new(Bounds::new(x + half_w, y, half_w, half_h), depth),
            Node::new(Bounds::new(x, y + half_h, half_w, half_h), depth),
            Node::new(Bounds::new(x + half_w, y + half_h, half_w, half_h), depth),
        ]);

        let entries = std::mem::take(&mut self.entries);
        for entry in entries {
            match children.iter_mut().find(|c| c.bounds.contains(&entry.bounds)) {
                Some(child) => child.entries.push(entry),
                None => self.entries.push(entry),
            }
        }
        self.children = Some(children);
    }

    fn remove(&mut self, id: ObjectId, bounds: &Bounds) -> bool {
        if let Some(pos) = self.entries.iter().position(|e| e.id == id) {
            self.entries.swap_remove(pos);
            return true;
        }

        let Some(children) = &mut self.children else {
            return false;
        };
        let Some(child) = children.iter_mut().find(|c| c.bounds.contains(bounds)) else {
            return false;
        };
        let removed = child.remove(id, bounds);
        if removed {
            self.collapse_if_empty();
        }
        removed
    }

    /// Drop the child array when all four are empty leaves.
    fn collapse_if_empty(&mut self) {
        let all_empty = self
            .children
            .as_ref()
            .is_some_and(|cs| cs.iter().all(|c| c.entries.is_empty() && c.children.is_none()));
        if all_empty {
            self.children = None;
        }
    }

    fn query(&self, rect: &Bounds, out: &mut Vec<ObjectId>) {
        // Node entries are checked unconditionally: root-level entries may
        // lie outside the root cell (out-of-world bounds are kept there).
        for entry in &self.entries {
            if entry.bounds.intersects(rect) {
                out.push(entry.id);
            }
        }
        if let Some(children) = &self.children {
            for child in children.iter().filter(|c| c.bounds.intersects(rect)) {
                child.query(rect, out);
            }
        }
    }
}
