//! Client errors.

use brew_protocol::{MessageType, ProtocolError};
use brew_transport::TransportError;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No publisher with this name and type has been declared.
    #[error("No publisher with name \"{name}\" and type \"{message_type}\" has been added")]
    UnknownPublisher {
        name: String,
        message_type: MessageType,
    },

    /// The client is not connected to a broker.
    #[error("Not connected")]
    NotConnected,

    /// Transport error.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Protocol error.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}
