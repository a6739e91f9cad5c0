//! Typed values exchanged with the broker.
//!
//! Every channel carries exactly one of three value types. Values travel as
//! strings on the wire; this module owns the conversion in both directions,
//! including the sanitization applied to whatever a peer sends us.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest value a range channel may carry.
pub const RANGE_MIN: u16 = 0;

/// Highest value a range channel may carry.
pub const RANGE_MAX: u16 = 1023;

/// The three channel types known to the broker.
///
/// Ordering follows the wire name (`boolean` < `range` < `string`) so sorted
/// collections list types the same way the broker spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Boolean,
    Range,
    String,
}

impl MessageType {
    /// The wire name of this type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Boolean => "boolean",
            MessageType::Range => "range",
            MessageType::String => "string",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("boolean") {
            Ok(MessageType::Boolean)
        } else if s.eq_ignore_ascii_case("range") {
            Ok(MessageType::Range)
        } else if s.eq_ignore_ascii_case("string") {
            Ok(MessageType::String)
        } else {
            Err(s.to_string())
        }
    }
}

/// A typed channel value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Boolean(bool),
    /// Always within `RANGE_MIN..=RANGE_MAX`.
    Range(u16),
    String(String),
}

impl Value {
    /// Build a range value, clamping into the protocol interval.
    #[must_use]
    pub fn range(value: i64) -> Self {
        Value::Range(clamp_range(value))
    }

    /// The channel type this value belongs to.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        match self {
            Value::Boolean(_) => MessageType::Boolean,
            Value::Range(_) => MessageType::Range,
            Value::String(_) => MessageType::String,
        }
    }

    /// The string form sent on the wire.
    #[must_use]
    pub fn to_wire(&self) -> String {
        match self {
            Value::Boolean(b) => b.to_string(),
            Value::Range(r) => r.to_string(),
            Value::String(s) => s.clone(),
        }
    }

    /// Interpret wire text as a value of the given type.
    ///
    /// Never fails: text that does not parse falls back to `false` or `0`.
    #[must_use]
    pub fn from_wire(message_type: MessageType, text: &str) -> Self {
        match message_type {
            MessageType::Boolean => Value::Boolean(sanitize_boolean(text)),
            MessageType::Range => Value::Range(sanitize_range(text)),
            MessageType::String => Value::String(text.to_string()),
        }
    }

    /// The default value a freshly declared channel of this type starts with.
    #[must_use]
    pub fn default_for(message_type: MessageType) -> Self {
        match message_type {
            MessageType::Boolean => Value::Boolean(false),
            MessageType::Range => Value::Range(RANGE_MIN),
            MessageType::String => Value::String(String::new()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::range(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::range(i64::from(v))
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::range(i64::from(v))
    }
}

/// Clamp an integer into `RANGE_MIN..=RANGE_MAX`.
#[must_use]
pub fn clamp_range(value: i64) -> u16 {
    value.clamp(i64::from(RANGE_MIN), i64::from(RANGE_MAX)) as u16
}

/// Parse a boolean case-insensitively. Anything but `true` is `false`.
#[must_use]
pub fn sanitize_boolean(text: &str) -> bool {
    text.eq_ignore_ascii_case("true")
}

/// Parse a range value, substituting `0` for unparseable text and clamping
/// the result.
#[must_use]
pub fn sanitize_range(text: &str) -> u16 {
    clamp_range(text.parse::<i64>().unwrap_or(0))
}

/// A declared publisher or subscriber.
///
/// Subscribers carry no default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDeclaration {
    pub name: String,
    pub message_type: MessageType,
    pub default: Option<String>,
}

impl ChannelDeclaration {
    /// Declare a publisher with its default value.
    #[must_use]
    pub fn publisher(name: impl Into<String>, default: &Value) -> Self {
        Self {
            name: name.into(),
            message_type: default.message_type(),
            default: Some(default.to_wire()),
        }
    }

    /// Declare a subscriber.
    #[must_use]
    pub fn subscriber(name: impl Into<String>, message_type: MessageType) -> Self {
        Self {
            name: name.into(),
            message_type,
            default: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_range() {
        assert_eq!(sanitize_range("abc"), 0);
        assert_eq!(sanitize_range("2000"), 1023);
        assert_eq!(sanitize_range("-5"), 0);
        assert_eq!(sanitize_range("512"), 512);
        assert_eq!(sanitize_range(""), 0);
        assert_eq!(sanitize_range("99999999999999999999999"), 0);
    }

    #[test]
    fn test_sanitize_range_stays_in_bounds() {
        for v in [-100_000i64, -1, 0, 1, 1022, 1023, 1024, 100_000] {
            let r = sanitize_range(&v.to_string());
            assert!(r <= RANGE_MAX);
        }
    }

    #[test]
    fn test_sanitize_boolean() {
        assert!(sanitize_boolean("true"));
        assert!(sanitize_boolean("TRUE"));
        assert!(sanitize_boolean("True"));
        assert!(!sanitize_boolean("false"));
        assert!(!sanitize_boolean("yes"));
        assert!(!sanitize_boolean(""));
    }

    #[test]
    fn test_message_type_parse() {
        assert_eq!("boolean".parse::<MessageType>(), Ok(MessageType::Boolean));
        assert_eq!("Range".parse::<MessageType>(), Ok(MessageType::Range));
        assert_eq!("STRING".parse::<MessageType>(), Ok(MessageType::String));
        assert!("number".parse::<MessageType>().is_err());
    }

    #[test]
    fn test_message_type_order_follows_wire_name() {
        let mut types = vec![MessageType::String, MessageType::Boolean, MessageType::Range];
        types.sort();
        let names: Vec<_> = types.iter().map(MessageType::as_str).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_value_wire_form() {
        assert_eq!(Value::Boolean(true).to_wire(), "true");
        assert_eq!(Value::range(700).to_wire(), "700");
        assert_eq!(Value::from("").to_wire(), "");
        assert_eq!(Value::from(5000i64), Value::Range(1023));
        assert_eq!(Value::from(-3i32), Value::Range(0));
    }

    #[test]
    fn test_publisher_declaration() {
        let decl = ChannelDeclaration::publisher("switch", &Value::Boolean(false));
        assert_eq!(decl.message_type, MessageType::Boolean);
        assert_eq!(decl.default.as_deref(), Some("false"));

        let decl = ChannelDeclaration::subscriber("time", MessageType::String);
        assert!(decl.default.is_none());
    }
}
