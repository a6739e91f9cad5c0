//! # brew-protocol
//!
//! Wire protocol definitions for the Spacebrew broker protocol.
//!
//! This crate defines the JSON envelopes exchanged between a client and a
//! broker, the three channel value types, and the sanitization rules applied
//! to inbound values.
//!
//! ## Envelopes
//!
//! - `config` - Announces the client's publishers and subscribers
//! - `message` - Carries one value on a named, typed channel
//!
//! ## Example
//!
//! ```rust
//! use brew_protocol::{codec, Value};
//!
//! let text = codec::encode_message("my-client", "switch", &Value::Boolean(true)).unwrap();
//! let decoded = codec::decode_message(&text).unwrap();
//! assert_eq!(decoded.value, Value::Boolean(true));
//! ```

pub mod codec;
pub mod envelope;
pub mod message;

pub use codec::{decode_message, encode_config, encode_message, InboundMessage, MessageCodec, ProtocolError};
pub use envelope::{ConfigEnvelope, MessageEnvelope};
pub use message::{ChannelDeclaration, MessageType, Value, RANGE_MAX, RANGE_MIN};
