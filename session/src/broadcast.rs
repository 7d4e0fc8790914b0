//! Outbound effect sink bridging the document engine to the socket writer.
//!
//! The document side only knows the [`Broadcaster`] trait; this adapter
//! turns effects into wire messages and feeds them to the writer channel.
//! When the connection is down every send degrades to a local no-op and
//! reports `false`, which is exactly what local-first mode needs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use board::manager::Broadcaster;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use wire::{ClientMessage, ObjectId, ObjectPayload};

/// Cheap-to-clone handle shared between the document engine and the session.
#[derive(Clone)]
pub struct BroadcastService {
    outbound: UnboundedSender<ClientMessage>,
    connected: Arc<AtomicBool>,
}

impl BroadcastService {
    #[must_use]
    pub fn new(outbound: UnboundedSender<ClientMessage>, connected: Arc<AtomicBool>) -> Self {
        Self { outbound, connected }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Queue a message for the writer task. Returns whether it was queued
    /// against a live connection.
    pub fn send(&self, message: ClientMessage) -> bool {
        if !self.is_connected() {
            debug!(tag = message.tag(), "dropping outbound message, not connected");
            return false;
        }
        self.outbound.send(message).is_ok()
    }

    /// Share this user's cursor position with the room.
    pub fn send_cursor(&self, x: f64, y: f64, tool: String, color: String) -> bool {
        self.send(ClientMessage::Cursor { x, y, tool, color })
    }
}

impl Broadcaster for BroadcastService {
    fn object_added(&self, payload: &ObjectPayload) -> bool {
        self.send(ClientMessage::ObjectAdded { object: payload.clone() })
    }

    fn object_updated(&self, payload: &ObjectPayload) -> bool {
        self.send(ClientMessage::ObjectUpdated { object: payload.clone() })
    }

    fn object_deleted(&self, id: ObjectId) -> bool {
        self.send(ClientMessage::ObjectDeleted { object_id: id })
    }
}
