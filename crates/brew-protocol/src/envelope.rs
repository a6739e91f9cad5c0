//! Envelope types for the broker protocol.
//!
//! The broker speaks JSON text. A client sends one `config` envelope per
//! connection and then exchanges `message` envelopes in both directions.
//! Field names here are fixed by the broker and must not change.

use serde::{Deserialize, Serialize};

use crate::message::{ChannelDeclaration, MessageType, Value};

/// Top-level handshake envelope: `{"config": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEnvelope {
    pub config: ClientConfigBody,
}

/// The announced client description and its channel lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfigBody {
    /// Client display name.
    pub name: String,
    /// Free-form client description.
    pub description: String,
    /// Declared publishers.
    pub publish: ChannelList<PublishEntry>,
    /// Declared subscribers.
    pub subscribe: ChannelList<SubscribeEntry>,
}

/// Wrapper object holding a `messages` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelList<T> {
    pub messages: Vec<T>,
}

/// A publisher as announced to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub default: String,
}

/// A subscriber as announced to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
}

/// Top-level value envelope: `{"message": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub message: MessageBody,
}

/// A single value travelling on a named channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    /// Name of the sending client.
    #[serde(rename = "clientName")]
    pub client_name: String,
    /// Channel name.
    pub name: String,
    /// Channel type.
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// String form of the value.
    pub value: String,
}

impl ConfigEnvelope {
    /// Build a config envelope from declarations, keeping their order.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        publishers: &[ChannelDeclaration],
        subscribers: &[ChannelDeclaration],
    ) -> Self {
        let publish = publishers
            .iter()
            .map(|decl| PublishEntry {
                name: decl.name.clone(),
                message_type: decl.message_type,
                default: decl
                    .default
                    .clone()
                    .unwrap_or_else(|| Value::default_for(decl.message_type).to_wire()),
            })
            .collect();

        let subscribe = subscribers
            .iter()
            .map(|decl| SubscribeEntry {
                name: decl.name.clone(),
                message_type: decl.message_type,
            })
            .collect();

        Self {
            config: ClientConfigBody {
                name: name.into(),
                description: description.into(),
                publish: ChannelList { messages: publish },
                subscribe: ChannelList {
                    messages: subscribe,
                },
            },
        }
    }
}

impl MessageEnvelope {
    /// Build a message envelope for a typed value.
    #[must_use]
    pub fn new(client_name: impl Into<String>, name: impl Into<String>, value: &Value) -> Self {
        Self {
            message: MessageBody {
                client_name: client_name.into(),
                name: name.into(),
                message_type: value.message_type(),
                value: value.to_wire(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_field_names() {
        let envelope = MessageEnvelope::new("client", "switch", &Value::Boolean(true));
        let json = serde_json::to_value(&envelope).unwrap();

        let body = &json["message"];
        assert_eq!(body["clientName"], "client");
        assert_eq!(body["name"], "switch");
        assert_eq!(body["type"], "boolean");
        assert_eq!(body["value"], "true");
    }

    #[test]
    fn test_subscriber_entries_have_no_default() {
        let subs = vec![ChannelDeclaration::subscriber("time", MessageType::String)];
        let envelope = ConfigEnvelope::new("client", "", &[], &subs);
        let json = serde_json::to_value(&envelope).unwrap();

        let entry = &json["config"]["subscribe"]["messages"][0];
        assert_eq!(entry["name"], "time");
        assert_eq!(entry["type"], "string");
        assert!(entry.get("default").is_none());
    }

    #[test]
    fn test_missing_publisher_default_uses_type_default() {
        let decl = ChannelDeclaration {
            name: "counter".into(),
            message_type: MessageType::Range,
            default: None,
        };
        let envelope = ConfigEnvelope::new("client", "", &[decl], &[]);
        assert_eq!(envelope.config.publish.messages[0].default, "0");
    }
}
