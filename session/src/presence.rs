//! Remote cursor presence for everyone else in the room.

use std::collections::HashMap;

use wire::ServerMessage;

/// Last-known cursor state of one peer.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCursor {
    pub user_id: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub tool: String,
}

/// Live map of peer cursors, updated from `cursor` and `userDisconnected`
/// messages.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    cursors: HashMap<String, RemoteCursor>,
}

impl PresenceTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or move a peer's cursor.
    pub fn update(&mut self, cursor: RemoteCursor) {
        self.cursors.insert(cursor.user_id.clone(), cursor);
    }

    /// Forget a peer that left.
    pub fn remove(&mut self, user_id: &str) -> bool {
        self.cursors.remove(user_id).is_some()
    }

    /// Drop everyone, e.g. after a reconnect where the room roster is stale.
    pub fn clear(&mut self) {
        self.cursors.clear();
    }

    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<&RemoteCursor> {
        self.cursors.get(user_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteCursor> {
        self.cursors.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Apply one presence-relevant server message; others are ignored.
    pub fn apply(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::Cursor { user_id, x, y, color, tool } => {
                self.update(RemoteCursor {
                    user_id: user_id.clone(),
                    x: *x,
                    y: *y,
                    color: color.clone(),
                    tool: tool.clone(),
                });
            }
            ServerMessage::UserDisconnected { user_id } => {
                self.remove(user_id);
            }
            _ => {}
        }
    }
}
