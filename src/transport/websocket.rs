//! The single WebSocket connection to the generation backend.
//!
//! A [`Connection`] is opened once per session and never re-established;
//! once [`Connection::next_event`] reports [`TransportEvent::Closed`] the
//! session is over.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::error::{AppError, Result};
use crate::protocol::OutboundMessage;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Something that happened on the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame arrived
    Text(String),
    /// The socket closed or failed; carries the close reason when known
    Closed(Option<String>),
}

/// Exclusive handle to the backend socket
pub struct Connection {
    url: String,
    sink: SplitSink<WsStream, WsMessage>,
    stream: SplitStream<WsStream>,
    closed: bool,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Connection {
    /// Connect to `url`, giving up after `timeout`
    pub async fn open(url: &str, timeout: Duration) -> Result<Self> {
        debug!(url = %url, "Connecting to backend");

        let (ws, _response) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| AppError::ConnectTimeout(url.to_string()))??;

        info!(url = %url, "Connected to backend");
        let (sink, stream) = ws.split();
        Ok(Self {
            url: url.to_string(),
            sink,
            stream,
            closed: false,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Serialize and send one message. Sends are not retried.
    pub async fn send(&mut self, message: &OutboundMessage) -> Result<()> {
        if self.closed {
            return Err(AppError::Transport(WsError::AlreadyClosed));
        }
        let text = message.to_json()?;
        trace!(len = text.len(), "Sending frame");
        self.sink.send(WsMessage::Text(text)).await.map_err(|e| {
            warn!(url = %self.url, error = %e, "Send failed");
            AppError::Transport(e)
        })
    }

    /// Wait for the next text frame or the end of the connection.
    ///
    /// Ping, pong and binary frames are skipped. Read errors are reported as
    /// a close. Safe to use as a `tokio::select!` branch.
    pub async fn next_event(&mut self) -> TransportEvent {
        if self.closed {
            return TransportEvent::Closed(None);
        }

        loop {
            match self.stream.next().await {
                Some(Ok(WsMessage::Text(text))) => return TransportEvent::Text(text),
                Some(Ok(WsMessage::Close(frame))) => {
                    self.closed = true;
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty());
                    info!(url = %self.url, reason = ?reason, "Backend closed the connection");
                    return TransportEvent::Closed(reason);
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.closed = true;
                    warn!(url = %self.url, error = %e, "Connection failed");
                    return TransportEvent::Closed(Some(e.to_string()));
                }
                None => {
                    self.closed = true;
                    info!(url = %self.url, "Connection ended");
                    return TransportEvent::Closed(None);
                }
            }
        }
    }

    /// Close the socket. Closing an already-closed connection is fine.
    pub async fn close(mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.sink.send(WsMessage::Close(None)).await {
            Ok(()) | Err(WsError::AlreadyClosed) | Err(WsError::ConnectionClosed) => {}
            Err(e) => return Err(AppError::Transport(e)),
        }
        match self.sink.close().await {
            Ok(()) | Err(WsError::AlreadyClosed) | Err(WsError::ConnectionClosed) => {}
            Err(e) => return Err(AppError::Transport(e)),
        }
        debug!(url = %self.url, "Connection closed");
        Ok(())
    }
}
