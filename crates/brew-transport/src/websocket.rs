//! WebSocket transport implementation.
//!
//! This module provides a client-side WebSocket transport using
//! tokio-tungstenite. Each handle runs one task that owns the socket, writes
//! queued text in order and turns everything it reads into events.

use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, handshake::client::Request, Error as WsError, Message},
};
use tracing::{debug, error, info, trace, warn};

use crate::traits::{Connector, EventSink, TransportError, TransportEvent, TransportHandle};

/// Close code reported when the peer sent a close frame without a status.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// WebSocket transport configuration.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Maximum inbound message size in bytes. Larger messages are dropped.
    pub max_message_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: 64 * 1024, // 64 KB
        }
    }
}

/// WebSocket connector.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector {
    config: WebSocketConfig,
}

impl WebSocketConnector {
    /// Create a new WebSocket connector.
    #[must_use]
    pub fn new(config: WebSocketConfig) -> Self {
        Self { config }
    }

    /// Get the connector configuration.
    #[must_use]
    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }
}

impl Connector for WebSocketConnector {
    fn open(&self, address: &str, events: EventSink) -> Result<Box<dyn TransportHandle>, TransportError> {
        let request = address
            .into_client_request()
            .map_err(|e| TransportError::InvalidAddress {
                address: address.to_string(),
                reason: e.to_string(),
            })?;

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TransportError::Other(format!("No Tokio runtime: {}", e)))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(true));

        info!(address = %address, generation = events.generation(), "Opening WebSocket");
        runtime.spawn(run_connection(
            request,
            rx,
            events,
            open.clone(),
            self.config.max_message_size,
        ));

        Ok(Box::new(WebSocketHandle {
            address: address.to_string(),
            tx,
            open,
        }))
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}

/// Commands from a handle to its connection task.
#[derive(Debug)]
enum Outbound {
    Text(String),
    Close,
}

/// A WebSocket handle.
pub struct WebSocketHandle {
    address: String,
    tx: mpsc::UnboundedSender<Outbound>,
    open: Arc<AtomicBool>,
}

impl TransportHandle for WebSocketHandle {
    fn send(&self, text: String) -> Result<(), TransportError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed);
        }

        self.tx
            .send(Outbound::Text(text))
            .map_err(|_| TransportError::ConnectionClosed)
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            // The task may already be gone
            let _ = self.tx.send(Outbound::Close);
        }
    }

    fn address(&self) -> &str {
        &self.address
    }
}

/// Wait until the handle asks to close, dropping text queued before the
/// handshake finished.
async fn close_requested(rx: &mut mpsc::UnboundedReceiver<Outbound>) {
    loop {
        match rx.recv().await {
            Some(Outbound::Text(_)) => warn!("Dropping message queued before the connection opened"),
            Some(Outbound::Close) | None => return,
        }
    }
}

async fn run_connection(
    request: Request,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: EventSink,
    open: Arc<AtomicBool>,
    max_message_size: usize,
) {
    let uri = request.uri().to_string();

    let connected = tokio::select! {
        result = connect_async(request) => result,
        () = close_requested(&mut outbound) => {
            debug!(address = %uri, "Closed before the handshake completed");
            open.store(false, Ordering::SeqCst);
            events.emit(TransportEvent::local_close());
            return;
        }
    };

    let ws_stream = match connected {
        Ok((stream, _response)) => stream,
        Err(e) => {
            error!(address = %uri, "WebSocket handshake failed: {}", e);
            open.store(false, Ordering::SeqCst);
            events.emit(TransportEvent::Error(format!("WebSocket handshake failed: {}", e)));
            events.emit(TransportEvent::abnormal_close(e.to_string()));
            return;
        }
    };

    debug!(address = %uri, "WebSocket handshake completed");
    events.emit(TransportEvent::Opened);

    let (mut sink, mut stream) = ws_stream.split();

    let closed = loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Text(text)) => {
                    trace!(bytes = text.len(), "Sending text");
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        error!("WebSocket send failed: {}", e);
                        events.emit(TransportEvent::Error(format!("Send failed: {}", e)));
                        break TransportEvent::abnormal_close(e.to_string());
                    }
                }
                Some(Outbound::Close) | None => {
                    debug!(address = %uri, "Closing WebSocket");
                    if let Err(e) = sink.send(Message::Close(None)).await {
                        debug!("Close frame not delivered: {}", e);
                    }
                    break TransportEvent::local_close();
                }
            },

            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if text.len() > max_message_size {
                        warn!(
                            "Message too large: {} bytes (max: {})",
                            text.len(),
                            max_message_size
                        );
                        continue;
                    }
                    events.emit(TransportEvent::Text(text));
                }
                Some(Ok(Message::Binary(data))) => {
                    if data.len() > max_message_size {
                        warn!(
                            "Message too large: {} bytes (max: {})",
                            data.len(),
                            max_message_size
                        );
                        continue;
                    }
                    // For compatibility, accept UTF-8 binary as text
                    match String::from_utf8(data) {
                        Ok(text) => {
                            events.emit(TransportEvent::Text(text));
                        }
                        Err(_) => warn!("Ignoring non-UTF-8 binary message"),
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = sink.send(Message::Pong(data)).await {
                        warn!("Failed to send pong: {}", e);
                    }
                }
                Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    debug!("Received close frame");
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.into_owned()))
                        .unwrap_or((CLOSE_NO_STATUS, String::new()));
                    if let Err(e) = sink.flush().await {
                        debug!("Close reply not delivered: {}", e);
                    }
                    break TransportEvent::Closed { code, reason, remote: true };
                }
                Some(Err(WsError::ConnectionClosed)) | None => {
                    debug!("WebSocket stream ended");
                    break TransportEvent::abnormal_close("stream ended");
                }
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    events.emit(TransportEvent::Error(e.to_string()));
                    break TransportEvent::abnormal_close(e.to_string());
                }
            },
        }
    };

    open.store(false, Ordering::SeqCst);
    events.emit(closed);
}
