//! Session configuration, resolved once at startup from the environment.

use std::time::Duration;

const DEFAULT_SERVER_URL: &str = "ws://localhost:3000/ws";
const DEFAULT_ACK_TIMEOUT_SECS: u64 = 5;
const DEFAULT_RECONNECT_DELAY_SECS: u64 = 2;
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
const DEFAULT_MAX_PASSWORD_ATTEMPTS: u32 = 3;

/// Connection and retry knobs for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket endpoint of the board server.
    pub server_url: String,
    /// Optional HTTP endpoint hit before the WebSocket upgrade to establish
    /// a cookie session. Skipped when unset.
    pub session_endpoint: Option<String>,
    /// How long an optimistic add may wait for its ack.
    pub ack_timeout: Duration,
    /// Fixed delay between reconnect attempts.
    pub reconnect_delay: Duration,
    /// Reconnect attempts before the session gives up.
    pub max_reconnect_attempts: u32,
    /// Password prompts per join before aborting.
    pub max_password_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_owned(),
            session_endpoint: None,
            ack_timeout: Duration::from_secs(DEFAULT_ACK_TIMEOUT_SECS),
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_DELAY_SECS),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            max_password_attempts: DEFAULT_MAX_PASSWORD_ATTEMPTS,
        }
    }
}

impl SessionConfig {
    /// Build from environment variables, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            server_url: std::env::var("BOARD_SERVER_URL")
                .unwrap_or_else(|_| DEFAULT_SERVER_URL.to_owned()),
            session_endpoint: std::env::var("BOARD_SESSION_ENDPOINT").ok(),
            ack_timeout: Duration::from_secs(env_parse(
                "BOARD_ACK_TIMEOUT_SECS",
                DEFAULT_ACK_TIMEOUT_SECS,
            )),
            reconnect_delay: Duration::from_secs(env_parse(
                "BOARD_RECONNECT_DELAY_SECS",
                DEFAULT_RECONNECT_DELAY_SECS,
            )),
            max_reconnect_attempts: env_parse(
                "BOARD_MAX_RECONNECT_ATTEMPTS",
                DEFAULT_MAX_RECONNECT_ATTEMPTS,
            ),
            max_password_attempts: env_parse(
                "BOARD_MAX_PASSWORD_ATTEMPTS",
                DEFAULT_MAX_PASSWORD_ATTEMPTS,
            ),
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
