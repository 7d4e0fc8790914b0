//! Session lifecycle: handshake, steady-state dispatch, reconnect.
//!
//! ARCHITECTURE
//! ============
//! A session starts in `Local` mode with a bare document engine; calling
//! [`SessionManager::run`] migrates it onto a server and keeps it there.
//! Each connection goes through the same phases:
//!
//! 1. socket open (optional cookie bootstrap)
//! 2. `authenticate` -> `authenticated` (server assigns the user id)
//! 3. `createRoom`/`joinRoom` -> `room_joined`, with a bounded number of
//!    interactive password prompts on `PASSWORD_*` errors
//! 4. one-time migration: locally drawn objects are re-owned and
//!    re-broadcast with ack confirmation
//! 5. `requestSync`, then the read loop dispatches through the router
//!
//! On disconnect every pending ack is rejected, presence is cleared, and a
//! fixed-delay reconnect loop re-runs the phases. Consecutive failures are
//! bounded; a success resets the counter.
//!
//! The document engine lives behind `Arc<Mutex<..>>` and every mutation is
//! serialized through it; locks are never held across an await.

use std::sync::{Arc, Mutex, PoisonError};

use board::manager::{Broadcaster, ObjectManager};
use board::object::DrawingObject;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};
use wire::{ClientMessage, ObjectId, ObjectPayload, ProtocolCode, ServerMessage};

use crate::ack::{AckOutcome, AckTracker};
use crate::broadcast::BroadcastService;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::presence::PresenceTracker;
use crate::router::MessageRouter;
use crate::socket::Connection;

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No network; all mutations stay on this machine.
    Local,
    Connecting,
    Connected,
    /// Was connected, currently between reconnect attempts.
    Disconnected,
    /// Gave up; see the error returned from [`SessionManager::run`].
    Error,
}

/// Whether to create the room or join an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomIntent {
    Create,
    Join,
}

/// Source of passwords for gated rooms.
///
/// `attempt` starts at 1 and counts prompts for the current join; returning
/// `None` aborts the join.
pub trait PasswordPrompt: Send {
    fn password_for(&mut self, room: &str, attempt: u32) -> Option<String>;
}

/// What happened to each locally drawn object during migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub succeeded: Vec<ObjectId>,
    pub failed: Vec<MigrationFailure>,
}

/// One object the server did not accept during migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFailure {
    pub id: ObjectId,
    pub reason: String,
}

/// Notifications surfaced to the embedding application.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StatusChanged(SessionStatus),
    /// Room membership confirmed; carries this user's presence color.
    RoomJoined { color: String },
    /// A server snapshot replaced the document.
    Synced { objects: usize },
    /// Local-first objects finished migrating onto the server.
    Migrated(MigrationReport),
    /// A tracked object creation reached its final disposition.
    ObjectAck { id: ObjectId, outcome: AckOutcome },
    /// A peer cursor moved or a peer left.
    PresenceChanged,
    /// The server reported a protocol-level failure outside a handshake.
    ProtocolError { code: ProtocolCode, message: String },
}

// =============================================================================
// SESSION MANAGER
// =============================================================================

/// Owner of the network side of one board session.
pub struct SessionManager {
    config: SessionConfig,
    manager: Arc<Mutex<ObjectManager>>,
    acks: AckTracker,
    presence: Arc<Mutex<PresenceTracker>>,
    status: Arc<Mutex<SessionStatus>>,
    events: UnboundedSender<SessionEvent>,
    room: Option<String>,
    room_password: Option<String>,
    intent: RoomIntent,
    migrated: bool,
}

impl SessionManager {
    /// Build a session around an existing (possibly already drawn-on)
    /// document engine. Returns the event stream alongside.
    #[must_use]
    pub fn new(
        config: SessionConfig,
        manager: Arc<Mutex<ObjectManager>>,
    ) -> (Self, UnboundedReceiver<SessionEvent>) {
        let (events, event_rx) = mpsc::unbounded_channel();
        let acks = AckTracker::new(config.ack_timeout);
        let session = Self {
            config,
            manager,
            acks,
            presence: Arc::new(Mutex::new(PresenceTracker::new())),
            status: Arc::new(Mutex::new(SessionStatus::Local)),
            events,
            room: None,
            room_password: None,
            intent: RoomIntent::Join,
            migrated: false,
        };
        (session, event_rx)
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shared handle for reading the status from other tasks.
    #[must_use]
    pub fn status_handle(&self) -> Arc<Mutex<SessionStatus>> {
        Arc::clone(&self.status)
    }

    #[must_use]
    pub fn presence_handle(&self) -> Arc<Mutex<PresenceTracker>> {
        Arc::clone(&self.presence)
    }

    #[must_use]
    pub fn ack_tracker(&self) -> AckTracker {
        self.acks.clone()
    }

    /// Connect to `room` and serve it until a fatal error or reconnect
    /// exhaustion.
    ///
    /// # Errors
    /// - [`SessionError::PasswordRejected`] / [`SessionError::PasswordUnavailable`]
    ///   when the room's password gate cannot be passed
    /// - [`SessionError::RoomNotFound`] for a bad room code on join
    /// - [`SessionError::ReconnectExhausted`] after too many consecutive
    ///   failed connection attempts
    pub async fn run(
        &mut self,
        room: &str,
        intent: RoomIntent,
        prompt: &mut dyn PasswordPrompt,
    ) -> Result<(), SessionError> {
        self.room = Some(room.to_owned());
        self.intent = intent;

        let mut failures: u32 = 0;
        loop {
            match self.connect_and_serve(prompt).await {
                Ok(()) => {
                    // Served and then lost the socket; reconnect fresh.
                    failures = 0;
                }
                Err(e) if is_fatal(&e) => {
                    self.set_status(SessionStatus::Error);
                    return Err(e);
                }
                Err(e) => {
                    failures += 1;
                    warn!(error = %e, attempt = failures, "connection attempt failed");
                    if failures >= self.config.max_reconnect_attempts {
                        self.set_status(SessionStatus::Error);
                        return Err(SessionError::ReconnectExhausted { attempts: failures });
                    }
                }
            }
            self.set_status(SessionStatus::Disconnected);
            tokio::time::sleep(self.config.reconnect_delay).await;
        }
    }

    // =========================================================================
    // CONNECTION LIFECYCLE
    // =========================================================================

    async fn connect_and_serve(
        &mut self,
        prompt: &mut dyn PasswordPrompt,
    ) -> Result<(), SessionError> {
        let room = self.room.clone().unwrap_or_default();
        self.set_status(SessionStatus::Connecting);

        let mut conn = Connection::open(&self.config, Some(&room)).await?;
        let mut router = self.build_router();

        conn.send(ClientMessage::Authenticate)?;
        let user_id = self.await_authenticated(&mut conn, &mut router).await?;
        info!(%user_id, %room, "authenticated");

        self.join_room(&mut conn, &mut router, &room, prompt).await?;
        self.set_status(SessionStatus::Connected);

        // From here on, every local mutation flows out through the tracker.
        let service = BroadcastService::new(conn.sender(), conn.connected_flag());
        let outbound = TrackingBroadcaster {
            service: service.clone(),
            acks: self.acks.clone(),
            events: self.events.clone(),
        };

        let migration_doc: Option<Vec<DrawingObject>> = {
            let mut mgr = self.manager.lock().unwrap_or_else(PoisonError::into_inner);
            let doc = if self.migrated {
                mgr.set_user_id(user_id.clone());
                None
            } else {
                Some(mgr.rehome_local_objects(&user_id))
            };
            mgr.set_broadcaster(Box::new(outbound));
            doc
        };
        if let Some(doc) = migration_doc {
            self.migrated = true;
            self.migrate(&service, doc);
        }

        conn.send(ClientMessage::RequestSync)?;

        while let Some(text) = conn.recv().await {
            if let Err(e) = router.dispatch(&text) {
                warn!(error = %e, "dropping malformed frame");
            }
        }

        info!(%room, "connection lost");
        self.acks.reject_all();
        self.presence.lock().unwrap_or_else(PoisonError::into_inner).clear();
        Ok(())
    }

    /// Wait for the server to assign a user id.
    async fn await_authenticated(
        &mut self,
        conn: &mut Connection,
        router: &mut MessageRouter,
    ) -> Result<String, SessionError> {
        while let Some(text) = conn.recv().await {
            match wire::decode(&text) {
                Ok(ServerMessage::Authenticated { user_id }) => return Ok(user_id),
                Ok(ServerMessage::Error { code, message }) => {
                    return Err(SessionError::Handshake { code, message });
                }
                _ => {
                    if let Err(e) = router.dispatch(&text) {
                        warn!(error = %e, "dropping malformed frame during handshake");
                    }
                }
            }
        }
        Err(SessionError::ConnectionClosed)
    }

    /// Create or join the room, re-prompting on password challenges up to
    /// the configured ceiling.
    async fn join_room(
        &mut self,
        conn: &mut Connection,
        router: &mut MessageRouter,
        room: &str,
        prompt: &mut dyn PasswordPrompt,
    ) -> Result<(), SessionError> {
        let mut prompts: u32 = 0;
        let mut password = self.room_password.clone();

        loop {
            conn.send(self.room_request(password.clone()))?;

            let reply = self.await_room_reply(conn, router).await?;
            match reply {
                RoomReply::Joined { color } => {
                    self.room_password = password;
                    // Reconnects must not try to re-create an existing room.
                    self.intent = RoomIntent::Join;
                    let _ = self.events.send(SessionEvent::RoomJoined { color });
                    return Ok(());
                }
                RoomReply::PasswordChallenge => {
                    if prompts >= self.config.max_password_attempts {
                        return Err(SessionError::PasswordRejected {
                            attempts: self.config.max_password_attempts,
                        });
                    }
                    prompts += 1;
                    match prompt.password_for(room, prompts) {
                        Some(p) => password = Some(p),
                        None => return Err(SessionError::PasswordUnavailable),
                    }
                }
            }
        }
    }

    async fn await_room_reply(
        &mut self,
        conn: &mut Connection,
        router: &mut MessageRouter,
    ) -> Result<RoomReply, SessionError> {
        while let Some(text) = conn.recv().await {
            match wire::decode(&text) {
                Ok(ServerMessage::RoomJoined { color }) => {
                    return Ok(RoomReply::Joined { color });
                }
                Ok(ServerMessage::Error { code, message }) => {
                    if code.is_password_challenge() {
                        debug!(?code, "password challenge");
                        return Ok(RoomReply::PasswordChallenge);
                    }
                    if code == ProtocolCode::RoomNotFound {
                        return Err(SessionError::RoomNotFound(
                            self.room.clone().unwrap_or_default(),
                        ));
                    }
                    return Err(SessionError::Handshake { code, message });
                }
                _ => {
                    if let Err(e) = router.dispatch(&text) {
                        warn!(error = %e, "dropping malformed frame during handshake");
                    }
                }
            }
        }
        Err(SessionError::ConnectionClosed)
    }

    fn room_request(&self, password: Option<String>) -> ClientMessage {
        match self.intent {
            RoomIntent::Create => ClientMessage::CreateRoom { password },
            RoomIntent::Join => ClientMessage::JoinRoom { password },
        }
    }

    // =========================================================================
    // MIGRATION
    // =========================================================================

    /// Re-broadcast locally drawn objects with ack confirmation and report
    /// the split once every outcome is in.
    fn migrate(&self, service: &BroadcastService, doc: Vec<DrawingObject>) {
        if doc.is_empty() {
            let _ = self.events.send(SessionEvent::Migrated(MigrationReport::default()));
            return;
        }

        info!(objects = doc.len(), "migrating local document to server");
        let mut waiters = Vec::with_capacity(doc.len());
        for object in &doc {
            let rx = self.acks.track(object.id);
            service.object_added(&object.to_payload());
            waiters.push((object.id, rx));
        }

        let events = self.events.clone();
        tokio::spawn(async move {
            let mut report = MigrationReport::default();
            for (id, rx) in waiters {
                match rx.await {
                    Ok(AckOutcome::Confirmed) => report.succeeded.push(id),
                    Ok(outcome) => {
                        warn!(%id, ?outcome, "object failed to migrate");
                        report.failed.push(MigrationFailure { id, reason: failure_reason(outcome) });
                    }
                    Err(_) => report.failed.push(MigrationFailure {
                        id,
                        reason: "ack tracker dropped".to_owned(),
                    }),
                }
            }
            let _ = events.send(SessionEvent::Migrated(report));
        });
    }

    // =========================================================================
    // INBOUND DISPATCH
    // =========================================================================

    fn build_router(&self) -> MessageRouter {
        let mut router = MessageRouter::new();

        let manager = Arc::clone(&self.manager);
        let events = self.events.clone();
        router.on("sync", move |value| {
            let Ok(ServerMessage::Sync { objects }) = serde_json::from_value(value) else {
                return;
            };
            let count = objects.len();
            let doc = objects.into_iter().map(DrawingObject::from_payload).collect();
            manager.lock().unwrap_or_else(PoisonError::into_inner).load_remote_snapshot(doc);
            let _ = events.send(SessionEvent::Synced { objects: count });
        });

        let manager = Arc::clone(&self.manager);
        router.on("objectAdded", move |value| {
            let Ok(ServerMessage::ObjectAdded { object, user_id }) = serde_json::from_value(value)
            else {
                return;
            };
            let payload = with_owner(object, user_id);
            manager.lock().unwrap_or_else(PoisonError::into_inner).add_remote_object(payload);
        });

        let manager = Arc::clone(&self.manager);
        router.on("objectUpdated", move |value| {
            let Ok(ServerMessage::ObjectUpdated { object, user_id }) =
                serde_json::from_value(value)
            else {
                return;
            };
            let payload = with_owner(object, user_id);
            manager.lock().unwrap_or_else(PoisonError::into_inner).update_remote_object(payload);
        });

        let manager = Arc::clone(&self.manager);
        router.on("objectDeleted", move |value| {
            let Ok(ServerMessage::ObjectDeleted { object_id, .. }) = serde_json::from_value(value)
            else {
                return;
            };
            manager.lock().unwrap_or_else(PoisonError::into_inner).remove_remote_object(object_id);
        });

        let acks = self.acks.clone();
        router.on("objectAdded_ack", move |value| {
            if let Ok(ServerMessage::ObjectAddedAck { object_id }) = serde_json::from_value(value) {
                acks.confirm(object_id);
            }
        });

        let acks = self.acks.clone();
        router.on("objectAdded_error", move |value| {
            if let Ok(ServerMessage::ObjectAddedError { object_id, error }) =
                serde_json::from_value(value)
            {
                acks.fail(object_id, error);
            }
        });

        let presence = Arc::clone(&self.presence);
        let events = self.events.clone();
        router.on("cursor", move |value| {
            if let Ok(msg @ ServerMessage::Cursor { .. }) = serde_json::from_value(value) {
                presence.lock().unwrap_or_else(PoisonError::into_inner).apply(&msg);
                let _ = events.send(SessionEvent::PresenceChanged);
            }
        });

        let presence = Arc::clone(&self.presence);
        let events = self.events.clone();
        router.on("userDisconnected", move |value| {
            if let Ok(msg @ ServerMessage::UserDisconnected { .. }) = serde_json::from_value(value)
            {
                presence.lock().unwrap_or_else(PoisonError::into_inner).apply(&msg);
                let _ = events.send(SessionEvent::PresenceChanged);
            }
        });

        let events = self.events.clone();
        router.on("error", move |value| {
            if let Ok(ServerMessage::Error { code, message }) = serde_json::from_value(value) {
                warn!(?code, %message, "server reported error");
                let _ = events.send(SessionEvent::ProtocolError { code, message });
            }
        });

        router
    }

    fn set_status(&self, status: SessionStatus) {
        let mut current = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != status {
            *current = status;
            let _ = self.events.send(SessionEvent::StatusChanged(status));
        }
    }
}

/// Server echoes carry the originating user at the message level; fold it
/// into the payload when the payload itself has none.
fn with_owner(mut payload: ObjectPayload, user_id: Option<String>) -> ObjectPayload {
    if payload.user_id.is_none() {
        payload.user_id = user_id;
    }
    payload
}

fn failure_reason(outcome: AckOutcome) -> String {
    match outcome {
        AckOutcome::Errored(message) => message,
        AckOutcome::TimedOut => "ack timed out".to_owned(),
        AckOutcome::Disconnected | AckOutcome::Confirmed => "connection closed".to_owned(),
        AckOutcome::Superseded => "superseded by a newer broadcast".to_owned(),
    }
}

fn is_fatal(error: &SessionError) -> bool {
    matches!(
        error,
        SessionError::Handshake { .. }
            | SessionError::PasswordRejected { .. }
            | SessionError::PasswordUnavailable
            | SessionError::RoomNotFound(_)
    )
}

// =============================================================================
// TRACKING BROADCASTER
// =============================================================================

/// [`Broadcaster`] that registers every outgoing add with the ack tracker
/// before it hits the wire, and surfaces the eventual outcome as an event.
struct TrackingBroadcaster {
    service: BroadcastService,
    acks: AckTracker,
    events: UnboundedSender<SessionEvent>,
}

impl Broadcaster for TrackingBroadcaster {
    fn object_added(&self, payload: &ObjectPayload) -> bool {
        if !self.service.is_connected() {
            return false;
        }
        // Track first: the ack must never race the registration.
        let rx = self.acks.track(payload.id);
        let id = payload.id;
        let events = self.events.clone();
        tokio::spawn(async move {
            if let Ok(outcome) = rx.await {
                let _ = events.send(SessionEvent::ObjectAck { id, outcome });
            }
        });
        self.service.object_added(payload)
    }

    fn object_updated(&self, payload: &ObjectPayload) -> bool {
        self.service.object_updated(payload)
    }

    fn object_deleted(&self, id: ObjectId) -> bool {
        self.service.object_deleted(id)
    }
}

enum RoomReply {
    Joined { color: String },
    PasswordChallenge,
}

/// Convenience for sessions that never prompt (unprotected rooms, bots).
pub struct NoPassword;

impl PasswordPrompt for NoPassword {
    fn password_for(&mut self, _room: &str, _attempt: u32) -> Option<String> {
        None
    }
}

/// Fixed password list, consumed one per prompt. Mostly useful in tests and
/// scripted clients.
pub struct StaticPasswords {
    passwords: Vec<String>,
}

impl StaticPasswords {
    #[must_use]
    pub fn new(passwords: Vec<String>) -> Self {
        Self { passwords }
    }
}

impl PasswordPrompt for StaticPasswords {
    fn password_for(&mut self, _room: &str, _attempt: u32) -> Option<String> {
        if self.passwords.is_empty() {
            None
        } else {
            Some(self.passwords.remove(0))
        }
    }
}
