//! Transport abstraction traits for brew clients.
//!
//! A transport opens handles to a broker address. Each handle accepts
//! outgoing text and reports what happens on the wire as events pushed into
//! an [`EventSink`], so the client can process them on its own task.

use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The broker address cannot be used.
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The handle has already been closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Something that happened on a transport handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established.
    Opened,
    /// A text message arrived.
    Text(String),
    /// The connection is gone. Always the last event of a handle.
    Closed {
        /// WebSocket close code (1006 when the connection dropped without one).
        code: u16,
        /// Close reason, possibly empty.
        reason: String,
        /// Whether the peer or the network ended the connection.
        remote: bool,
    },
    /// A transport error. A `Closed` event normally follows.
    Error(String),
}

impl TransportEvent {
    /// A close without a close frame.
    #[must_use]
    pub fn abnormal_close(reason: impl Into<String>) -> Self {
        TransportEvent::Closed {
            code: CLOSE_ABNORMAL,
            reason: reason.into(),
            remote: true,
        }
    }

    /// A close we initiated.
    #[must_use]
    pub fn local_close() -> Self {
        TransportEvent::Closed {
            code: CLOSE_NORMAL,
            reason: String::new(),
            remote: false,
        }
    }
}

/// Normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Closed without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Events tagged with the generation of the handle that produced them.
pub type TaggedEvent = (u64, TransportEvent);

/// Where a handle delivers its events.
///
/// Every event is tagged with the handle's generation so the receiver can
/// discard events from handles it has since replaced.
#[derive(Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl EventSink {
    /// Create a sink for the handle with `generation`.
    #[must_use]
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        Self { generation, tx }
    }

    /// The generation this sink tags events with.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deliver an event. Returns `false` if nobody is listening anymore.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx.send((self.generation, event)).is_ok()
    }

    /// Whether the receiving side has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("generation", &self.generation)
            .finish()
    }
}

/// Opens connections to a broker.
pub trait Connector: Send + Sync {
    /// Open a handle to `address`.
    ///
    /// Returns immediately; the handshake completes in the background and is
    /// reported through `events` (`Opened`, or `Error` followed by `Closed`).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be used at all.
    fn open(&self, address: &str, events: EventSink) -> Result<Box<dyn TransportHandle>, TransportError>;

    /// Get the transport name (e.g., "websocket").
    fn name(&self) -> &'static str;
}

/// A live transport handle.
///
/// Sends are queued in call order and never block. Dropping the handle
/// closes the connection.
pub trait TransportHandle: Send + Sync {
    /// Queue a text message.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is closed.
    fn send(&self, text: String) -> Result<(), TransportError>;

    /// Close the connection. A `Closed` event follows.
    fn close(&self);

    /// Get the address this handle was opened with.
    fn address(&self) -> &str;
}
