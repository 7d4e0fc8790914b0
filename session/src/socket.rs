//! WebSocket transport: connect, cookie bootstrap, writer task, reads.
//!
//! ARCHITECTURE
//! ============
//! One [`Connection`] per socket. Writes go through an unbounded channel
//! into a dedicated writer task, so any number of clones of the sender can
//! queue messages without locking the stream; reads stay on the owning
//! task via [`Connection::recv`]. A shared atomic `connected` flag lets the
//! broadcast side observe liveness without touching the stream.
//!
//! Before the upgrade, an optional HTTP session endpoint is hit and its
//! cookies are replayed on the upgrade request, matching servers that gate
//! the socket behind a cookie session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{SplitStream, StreamExt};
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{COOKIE, SET_COOKIE};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use wire::ClientMessage;

use crate::config::SessionConfig;
use crate::error::SessionError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A live socket plus its writer task.
pub struct Connection {
    outbound: UnboundedSender<ClientMessage>,
    inbound: SplitStream<WsStream>,
    connected: Arc<AtomicBool>,
    writer: JoinHandle<()>,
}

impl Connection {
    /// Open a socket to the server, optionally scoped to a room.
    ///
    /// # Errors
    /// Returns [`SessionError::Http`] if the cookie bootstrap fails and
    /// [`SessionError::Ws`] if the upgrade does.
    pub async fn open(config: &SessionConfig, room: Option<&str>) -> Result<Self, SessionError> {
        let cookies = match &config.session_endpoint {
            Some(endpoint) => fetch_session_cookies(endpoint).await?,
            None => None,
        };

        let url = match room {
            Some(code) => format!("{}?room={code}", config.server_url),
            None => config.server_url.clone(),
        };

        let mut request = url.clone().into_client_request()?;
        if let Some(cookie_header) = cookies {
            request.headers_mut().insert(COOKIE, cookie_header);
        }

        let (stream, _response) = connect_async(request).await?;
        info!(%url, "websocket connected");

        let (mut sink, inbound) = stream.split();
        let connected = Arc::new(AtomicBool::new(true));
        let (outbound, mut rx) = mpsc::unbounded_channel::<ClientMessage>();

        let flag = Arc::clone(&connected);
        let writer = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let json = match wire::encode(&message) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "failed to encode outbound message, skipping");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(json.into())).await {
                    warn!(error = %e, "websocket write failed");
                    flag.store(false, Ordering::SeqCst);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        Ok(Self { outbound, inbound, connected, writer })
    }

    /// Queue one message for the writer task.
    ///
    /// # Errors
    /// Returns [`SessionError::NotConnected`] when the socket is gone.
    pub fn send(&self, message: ClientMessage) -> Result<(), SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        self.outbound.send(message).map_err(|_| SessionError::NotConnected)
    }

    /// Next text frame, or `None` once the socket is closed. Control frames
    /// are handled by the library; binary frames are ignored.
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            match self.inbound.next().await {
                Some(Ok(Message::Text(text))) => return Some(text.to_string()),
                Some(Ok(Message::Close(_))) | None => {
                    self.connected.store(false, Ordering::SeqCst);
                    return None;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "websocket read failed");
                    self.connected.store(false, Ordering::SeqCst);
                    return None;
                }
            }
        }
    }

    /// Clone of the writer-channel sender, for the broadcast service.
    #[must_use]
    pub fn sender(&self) -> UnboundedSender<ClientMessage> {
        self.outbound.clone()
    }

    /// Shared liveness flag, for the broadcast service.
    #[must_use]
    pub fn connected_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.connected)
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
        self.writer.abort();
    }
}

/// Hit the HTTP session endpoint and fold its `Set-Cookie` headers into one
/// `Cookie` header value for the upgrade request.
async fn fetch_session_cookies(
    endpoint: &str,
) -> Result<Option<tokio_tungstenite::tungstenite::http::HeaderValue>, SessionError> {
    let client = reqwest::Client::builder().cookie_store(true).build()?;
    let response = client.get(endpoint).send().await?.error_for_status()?;

    let pairs: Vec<String> = response
        .headers()
        .get_all(SET_COOKIE.as_str())
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(ToOwned::to_owned)
        .collect();

    if pairs.is_empty() {
        debug!(%endpoint, "session endpoint set no cookies");
        return Ok(None);
    }

    let header = pairs.join("; ");
    match tokio_tungstenite::tungstenite::http::HeaderValue::from_str(&header) {
        Ok(value) => Ok(Some(value)),
        Err(_) => {
            warn!("session cookie not header-safe, skipping");
            Ok(None)
        }
    }
}
