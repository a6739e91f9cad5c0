//! Codec for the broker's JSON envelopes.
//!
//! Encoding produces the exact text sent over the transport. Decoding is
//! deliberately lenient about values and strict only about structure: a peer
//! may send any value text, but an envelope without a `message` object cannot
//! be dispatched and is rejected.

use serde_json::Value as Json;
use thiserror::Error;

use crate::envelope::{ConfigEnvelope, MessageEnvelope};
use crate::message::{ChannelDeclaration, MessageType, Value};

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The text is not valid JSON, or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level JSON value is not an object.
    #[error("Envelope is not a JSON object")]
    NotAnObject,

    /// The envelope has no `message` object.
    #[error("Envelope has no message object")]
    MissingMessage,

    /// A field needed for dispatch is absent.
    #[error("Message is missing field: {0}")]
    MissingField(&'static str),

    /// The message names a type the protocol does not define.
    #[error("Unknown message type: {0}")]
    UnknownType(String),
}

/// A decoded inbound message with its value already sanitized.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Name of the client that published the value, when present.
    pub client_name: Option<String>,
    /// Channel name.
    pub name: String,
    /// Sanitized value; its type is the channel type.
    pub value: Value,
}

impl InboundMessage {
    /// The channel type of this message.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.value.message_type()
    }
}

/// Encode the config handshake.
///
/// Declarations are written in the order given; callers pass a sorted
/// registry snapshot so the output is stable.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_config(
    client_name: &str,
    description: &str,
    publishers: &[ChannelDeclaration],
    subscribers: &[ChannelDeclaration],
) -> Result<String, ProtocolError> {
    let envelope = ConfigEnvelope::new(client_name, description, publishers, subscribers);
    Ok(serde_json::to_string(&envelope)?)
}

/// Encode a value message.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_message(client_name: &str, name: &str, value: &Value) -> Result<String, ProtocolError> {
    let envelope = MessageEnvelope::new(client_name, name, value);
    Ok(serde_json::to_string(&envelope)?)
}

/// Decode an inbound message envelope.
///
/// # Errors
///
/// Returns an error if the text is not JSON, is not an object, lacks the
/// `message` object, or the message lacks a name or a known type.
pub fn decode_message(text: &str) -> Result<InboundMessage, ProtocolError> {
    let root: Json = serde_json::from_str(text)?;
    let root = root.as_object().ok_or(ProtocolError::NotAnObject)?;

    let message = root
        .get("message")
        .and_then(Json::as_object)
        .ok_or(ProtocolError::MissingMessage)?;

    let name = message
        .get("name")
        .and_then(Json::as_str)
        .ok_or(ProtocolError::MissingField("name"))?;

    let type_name = message
        .get("type")
        .and_then(Json::as_str)
        .ok_or(ProtocolError::MissingField("type"))?;
    let message_type: MessageType = type_name.parse().map_err(ProtocolError::UnknownType)?;

    let raw = match message.get("value") {
        Some(Json::String(s)) => s.clone(),
        Some(Json::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let client_name = message
        .get("clientName")
        .and_then(Json::as_str)
        .map(str::to_string);

    Ok(InboundMessage {
        client_name,
        name: name.to_string(),
        value: Value::from_wire(message_type, &raw),
    })
}

/// Codec bound to one client's identity.
#[derive(Debug, Clone, Default)]
pub struct MessageCodec {
    client_name: String,
    description: String,
}

impl MessageCodec {
    /// Create a codec for the named client.
    #[must_use]
    pub fn new(client_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            description: description.into(),
        }
    }

    /// The client name stamped on outgoing messages.
    #[must_use]
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// The description sent in the config handshake.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Change the client name.
    pub fn set_client_name(&mut self, name: impl Into<String>) {
        self.client_name = name.into();
    }

    /// Change the description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Encode the config handshake for this client.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode_config(
        &self,
        publishers: &[ChannelDeclaration],
        subscribers: &[ChannelDeclaration],
    ) -> Result<String, ProtocolError> {
        encode_config(&self.client_name, &self.description, publishers, subscribers)
    }

    /// Encode a value message from this client.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode_message(&self, name: &str, value: &Value) -> Result<String, ProtocolError> {
        encode_message(&self.client_name, name, value)
    }

    /// Decode an inbound message.
    ///
    /// # Errors
    ///
    /// Returns an error if the envelope is malformed.
    pub fn decode_message(&self, text: &str) -> Result<InboundMessage, ProtocolError> {
        decode_message(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let values = vec![
            ("switch", Value::Boolean(true)),
            ("switch", Value::Boolean(false)),
            ("counter", Value::Range(0)),
            ("counter", Value::Range(1023)),
            ("time", Value::String("12:00".into())),
            ("time", Value::String(String::new())),
        ];

        for (name, value) in values {
            let encoded = encode_message("client", name, &value).unwrap();
            let decoded = decode_message(&encoded).unwrap();
            assert_eq!(decoded.name, name);
            assert_eq!(decoded.message_type(), value.message_type());
            assert_eq!(decoded.value, value);
            assert_eq!(decoded.client_name.as_deref(), Some("client"));
        }
    }

    #[test]
    fn test_encode_message_exact_text() {
        let text = encode_message("c", "counter", &Value::Range(42)).unwrap();
        assert_eq!(
            text,
            r#"{"message":{"clientName":"c","name":"counter","type":"range","value":"42"}}"#
        );
    }

    #[test]
    fn test_encode_config_exact_text() {
        let publishers = vec![ChannelDeclaration::publisher("switch", &Value::Boolean(false))];
        let subscribers = vec![ChannelDeclaration::subscriber("counter", MessageType::Range)];
        let text = encode_config("c", "d", &publishers, &subscribers).unwrap();
        assert_eq!(
            text,
            concat!(
                r#"{"config":{"name":"c","description":"d","#,
                r#""publish":{"messages":[{"name":"switch","type":"boolean","default":"false"}]},"#,
                r#""subscribe":{"messages":[{"name":"counter","type":"range"}]}}}"#
            )
        );
    }

    #[test]
    fn test_decode_sanitizes_range() {
        let text = r#"{"message":{"clientName":"x","name":"n","type":"range","value":"2000"}}"#;
        assert_eq!(decode_message(text).unwrap().value, Value::Range(1023));

        let text = r#"{"message":{"clientName":"x","name":"n","type":"range","value":"abc"}}"#;
        assert_eq!(decode_message(text).unwrap().value, Value::Range(0));

        let text = r#"{"message":{"clientName":"x","name":"n","type":"range","value":"-5"}}"#;
        assert_eq!(decode_message(text).unwrap().value, Value::Range(0));
    }

    #[test]
    fn test_decode_lenient_values() {
        let text = r#"{"message":{"name":"n","type":"boolean","value":"TRUE"}}"#;
        let decoded = decode_message(text).unwrap();
        assert_eq!(decoded.value, Value::Boolean(true));
        assert!(decoded.client_name.is_none());

        let text = r#"{"message":{"name":"n","type":"boolean","value":"maybe"}}"#;
        assert_eq!(decode_message(text).unwrap().value, Value::Boolean(false));

        let text = r#"{"message":{"name":"n","type":"range","value":512}}"#;
        assert_eq!(decode_message(text).unwrap().value, Value::Range(512));

        let text = r#"{"message":{"name":"n","type":"string"}}"#;
        assert_eq!(decode_message(text).unwrap().value, Value::String(String::new()));
    }

    #[test]
    fn test_decode_structural_errors() {
        assert!(matches!(decode_message("not json"), Err(ProtocolError::Json(_))));
        assert!(matches!(decode_message("[1, 2]"), Err(ProtocolError::NotAnObject)));
        assert!(matches!(
            decode_message(r#"{"config":{}}"#),
            Err(ProtocolError::MissingMessage)
        ));
        assert!(matches!(
            decode_message(r#"{"message":{"type":"string","value":"x"}}"#),
            Err(ProtocolError::MissingField("name"))
        ));
        assert!(matches!(
            decode_message(r#"{"message":{"name":"n","type":"float","value":"1.0"}}"#),
            Err(ProtocolError::UnknownType(_))
        ));
    }

    #[test]
    fn test_codec_uses_client_identity() {
        let mut codec = MessageCodec::new("first", "desc");
        codec.set_client_name("second");
        let text = codec.encode_message("time", &Value::from("now")).unwrap();
        let decoded = codec.decode_message(&text).unwrap();
        assert_eq!(decoded.client_name.as_deref(), Some("second"));
        assert_eq!(codec.description(), "desc");
    }
}
