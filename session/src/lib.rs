//! Network session layer for the whiteboard sync engine.
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Connection and retry knobs, resolved from the environment |
//! | [`error`] | Session error type with grepable codes |
//! | [`socket`] | WebSocket transport with cookie bootstrap and writer task |
//! | [`router`] | Inbound dispatch keyed on the wire `type` tag |
//! | [`ack`] | Outcome tracking for optimistic object creation |
//! | [`broadcast`] | Outbound effect sink bridging the engine to the socket |
//! | [`presence`] | Peer cursor map |
//! | [`room`] | Room code generation and validation |
//! | [`session`] | Handshake, steady-state loop, reconnect, migration |

pub mod ack;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod presence;
pub mod room;
pub mod router;
pub mod session;
pub mod socket;

pub use ack::{AckOutcome, AckTracker};
pub use broadcast::BroadcastService;
pub use config::SessionConfig;
pub use error::SessionError;
pub use presence::{PresenceTracker, RemoteCursor};
pub use router::MessageRouter;
pub use session::{
    MigrationFailure, MigrationReport, NoPassword, PasswordPrompt, RoomIntent, SessionEvent,
    SessionManager, SessionStatus, StaticPasswords,
};
pub use socket::Connection;
