//! Wire protocol model for the whiteboard sync engine.
//!
//! This crate owns the JSON message shapes exchanged with the server of
//! record. Every message is a JSON object with a mandatory `type`
//! discriminator; the discriminator spellings are part of the protocol and
//! must not change (`objectAdded_ack`, `room_joined`, etc. are exact).
//!
//! DESIGN
//! ======
//! - Messages are tagged unions (`ClientMessage`, `ServerMessage`), not
//!   duck-typed maps: adding a message kind means adding a variant, and the
//!   session layer's handler registry dispatches on [`tag`] without a
//!   central switch.
//! - The per-object `data` payload stays an open `serde_json::Value` bag —
//!   the engine treats geometry + style as opaque and last-write-wins at
//!   whole-object granularity.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;

/// Unique identifier for a drawing object.
pub type ObjectId = Uuid;

// =============================================================================
// ERRORS
// =============================================================================

/// Error returned when decoding inbound wire text.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The text is not valid JSON or does not match any known message shape.
    #[error("malformed wire message: {0}")]
    Json(#[from] serde_json::Error),
    /// The JSON object has no `type` discriminator.
    #[error("wire message missing `type` discriminator")]
    MissingType,
}

// =============================================================================
// OBJECT PAYLOAD
// =============================================================================

/// The kind of a drawing object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Freehand polyline recorded from pointer samples.
    Stroke,
    /// Axis-aligned rectangle.
    Rectangle,
    /// Circle described by center and radius.
    Circle,
    /// Straight line segment between two endpoints.
    Line,
    /// Text block anchored at its top-left corner.
    Text,
}

/// A drawing object as carried on the wire.
///
/// `data` is the opaque geometry + style payload; the transient `selected`
/// flag of the in-memory object is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPayload {
    /// Unique object identifier.
    pub id: ObjectId,
    /// Shape kind.
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    /// Opaque geometry + style payload.
    pub data: Value,
    /// Owning user, if known.
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

// =============================================================================
// PROTOCOL ERROR CODES
// =============================================================================

/// Grepable error codes carried on inbound `error` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolCode {
    /// The room requires a password and none was supplied.
    PasswordRequired,
    /// A password was supplied but rejected.
    InvalidPassword,
    /// The requested room code does not exist.
    RoomNotFound,
    /// Unclassified server-side failure.
    Internal,
    /// Any code this client does not recognize.
    #[serde(other)]
    Unknown,
}

impl ProtocolCode {
    /// True for the two codes that trigger an interactive password re-prompt.
    #[must_use]
    pub fn is_password_challenge(self) -> bool {
        matches!(self, Self::PasswordRequired | Self::InvalidPassword)
    }
}

// =============================================================================
// OUTBOUND MESSAGES
// =============================================================================

/// Messages sent from this client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// First message after socket open; server replies `authenticated`.
    #[serde(rename = "authenticate")]
    Authenticate,
    /// Create the room named in the socket URL's `room` query parameter.
    #[serde(rename = "createRoom")]
    CreateRoom {
        #[serde(skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
    /// Join the room named in the socket URL's `room` query parameter.
    #[serde(rename = "joinRoom")]
    JoinRoom {
        #[serde(skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
    /// A local object was created.
    #[serde(rename = "objectAdded")]
    ObjectAdded { object: ObjectPayload },
    /// A local object's payload changed (whole-object last-write-wins).
    #[serde(rename = "objectUpdated")]
    ObjectUpdated { object: ObjectPayload },
    /// A local object was deleted.
    #[serde(rename = "objectDeleted")]
    ObjectDeleted {
        #[serde(rename = "objectId")]
        object_id: ObjectId,
    },
    /// Ephemeral cursor position for presence display.
    #[serde(rename = "cursor")]
    Cursor { x: f64, y: f64, tool: String, color: String },
    /// Ask the server for a full object snapshot of the room.
    #[serde(rename = "requestSync")]
    RequestSync,
}

impl ClientMessage {
    /// The wire `type` discriminator of this message.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Authenticate => "authenticate",
            Self::CreateRoom { .. } => "createRoom",
            Self::JoinRoom { .. } => "joinRoom",
            Self::ObjectAdded { .. } => "objectAdded",
            Self::ObjectUpdated { .. } => "objectUpdated",
            Self::ObjectDeleted { .. } => "objectDeleted",
            Self::Cursor { .. } => "cursor",
            Self::RequestSync => "requestSync",
        }
    }
}

// =============================================================================
// INBOUND MESSAGES
// =============================================================================

/// Messages received from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Transport-session identity assigned by the server.
    #[serde(rename = "authenticated")]
    Authenticated {
        #[serde(rename = "userId")]
        user_id: String,
    },
    /// Room membership confirmed; carries this user's presence color.
    #[serde(rename = "room_joined")]
    RoomJoined { color: String },
    /// Full object snapshot of the room.
    #[serde(rename = "sync")]
    Sync { objects: Vec<ObjectPayload> },
    /// A peer created an object.
    #[serde(rename = "objectAdded")]
    ObjectAdded {
        object: ObjectPayload,
        #[serde(rename = "userId")]
        user_id: Option<String>,
    },
    /// A peer replaced an object's payload.
    #[serde(rename = "objectUpdated")]
    ObjectUpdated {
        object: ObjectPayload,
        #[serde(rename = "userId")]
        user_id: Option<String>,
    },
    /// A peer deleted an object.
    #[serde(rename = "objectDeleted")]
    ObjectDeleted {
        #[serde(rename = "objectId")]
        object_id: ObjectId,
        #[serde(rename = "userId")]
        user_id: Option<String>,
    },
    /// Server accepted a confirmation-seeking `objectAdded`.
    #[serde(rename = "objectAdded_ack")]
    ObjectAddedAck {
        #[serde(rename = "objectId")]
        object_id: ObjectId,
    },
    /// Server rejected a confirmation-seeking `objectAdded`.
    #[serde(rename = "objectAdded_error")]
    ObjectAddedError {
        #[serde(rename = "objectId")]
        object_id: ObjectId,
        error: String,
    },
    /// A peer's cursor moved.
    #[serde(rename = "cursor")]
    Cursor {
        #[serde(rename = "userId")]
        user_id: String,
        x: f64,
        y: f64,
        color: String,
        tool: String,
    },
    /// A peer left the room.
    #[serde(rename = "userDisconnected")]
    UserDisconnected {
        #[serde(rename = "userId")]
        user_id: String,
    },
    /// Protocol-level failure for the most recent request.
    #[serde(rename = "error")]
    Error { code: ProtocolCode, message: String },
}

impl ServerMessage {
    /// The wire `type` discriminator of this message.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Authenticated { .. } => "authenticated",
            Self::RoomJoined { .. } => "room_joined",
            Self::Sync { .. } => "sync",
            Self::ObjectAdded { .. } => "objectAdded",
            Self::ObjectUpdated { .. } => "objectUpdated",
            Self::ObjectDeleted { .. } => "objectDeleted",
            Self::ObjectAddedAck { .. } => "objectAdded_ack",
            Self::ObjectAddedError { .. } => "objectAdded_error",
            Self::Cursor { .. } => "cursor",
            Self::UserDisconnected { .. } => "userDisconnected",
            Self::Error { .. } => "error",
        }
    }
}

// =============================================================================
// CODEC HELPERS
// =============================================================================

/// Extract the `type` discriminator from raw inbound text without committing
/// to a full decode. The session layer's handler registry dispatches on this.
///
/// # Errors
///
/// Returns [`WireError::Json`] for malformed JSON and
/// [`WireError::MissingType`] when the object has no string `type` field.
pub fn tag(text: &str) -> Result<String, WireError> {
    let value: Value = serde_json::from_str(text)?;
    value
        .get("type")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or(WireError::MissingType)
}

/// Decode one inbound message.
///
/// # Errors
///
/// Returns [`WireError::Json`] when the text does not match any known
/// inbound message shape.
pub fn decode(text: &str) -> Result<ServerMessage, WireError> {
    Ok(serde_json::from_str(text)?)
}

/// Encode one outbound message.
///
/// # Errors
///
/// Returns [`WireError::Json`] if serialization fails (it does not for any
/// constructible [`ClientMessage`]).
pub fn encode(msg: &ClientMessage) -> Result<String, WireError> {
    Ok(serde_json::to_string(msg)?)
}
