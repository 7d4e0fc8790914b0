//! Session-level error type with grepable codes.

use thiserror::Error;
use wire::ProtocolCode;

/// Failures of the network session layer.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("E_HTTP: session bootstrap failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("E_WS: websocket failure: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("E_WIRE: malformed message: {0}")]
    Wire(#[from] wire::WireError),

    #[error("E_HANDSHAKE: server rejected handshake ({code:?}): {message}")]
    Handshake { code: ProtocolCode, message: String },

    #[error("E_PASSWORD_REJECTED: gave up after {attempts} password attempts")]
    PasswordRejected { attempts: u32 },

    #[error("E_PASSWORD_REQUIRED: room requires a password and no prompt is available")]
    PasswordUnavailable,

    #[error("E_ROOM_NOT_FOUND: no room {0}")]
    RoomNotFound(String),

    #[error("E_CONNECTION_CLOSED: connection closed during handshake")]
    ConnectionClosed,

    #[error("E_NOT_CONNECTED: no live connection")]
    NotConnected,

    #[error("E_RECONNECT_EXHAUSTED: gave up after {attempts} reconnect attempts")]
    ReconnectExhausted { attempts: u32 },
}
