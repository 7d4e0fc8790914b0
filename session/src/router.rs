//! Inbound message dispatch keyed on the wire `type` tag.
//!
//! Handlers receive the raw JSON value and do their own payload decoding;
//! a tag nobody registered for is logged and dropped, never an error, so
//! the protocol can grow server-side without breaking older clients.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;
use wire::WireError;

type Handler = Box<dyn FnMut(Value) + Send>;

/// Registry mapping message tags to handlers.
#[derive(Default)]
pub struct MessageRouter {
    handlers: HashMap<String, Handler>,
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("registered", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MessageRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one tag, replacing any previous one.
    pub fn on<F>(&mut self, tag: impl Into<String>, handler: F)
    where
        F: FnMut(Value) + Send + 'static,
    {
        self.handlers.insert(tag.into(), Box::new(handler));
    }

    /// Dispatch one raw text frame. Returns whether a handler ran.
    ///
    /// # Errors
    /// Returns [`WireError`] when the text is not JSON or carries no `type`
    /// field.
    pub fn dispatch(&mut self, text: &str) -> Result<bool, WireError> {
        let tag = wire::tag(text)?;
        let value: Value = serde_json::from_str(text)?;
        match self.handlers.get_mut(&tag) {
            Some(handler) => {
                handler(value);
                Ok(true)
            }
            None => {
                warn!(%tag, "no handler registered, dropping message");
                Ok(false)
            }
        }
    }
}
