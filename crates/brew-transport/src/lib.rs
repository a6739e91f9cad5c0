//! # brew-transport
//!
//! Transport abstraction layer for brew clients.
//!
//! This crate provides a unified interface for reaching a broker:
//!
//! - **WebSocket** - The broker's native transport
//! - **Loopback** - In-process, for tests and embedding
//!
//! ## Transport Abstraction
//!
//! A `Connector` opens a `TransportHandle` and reports what happens on it as
//! `TransportEvent`s through an `EventSink`, allowing the client to be
//! transport-agnostic.
//!
//! ```rust,ignore
//! use brew_transport::{Connector, EventSink, TransportEvent};
//!
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let handle = connector.open("ws://localhost:9000", EventSink::new(1, tx))?;
//! while let Some((_, event)) = rx.recv().await {
//!     if let TransportEvent::Opened = event {
//!         handle.send("{...}".into())?;
//!     }
//! }
//! ```

pub mod loopback;
pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use loopback::LoopbackConnector;
pub use traits::{
    Connector, EventSink, TaggedEvent, TransportError, TransportEvent, TransportHandle,
    CLOSE_ABNORMAL, CLOSE_NORMAL,
};

#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConfig, WebSocketConnector};
