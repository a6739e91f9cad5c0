//! Client configuration.
//!
//! Everything an application can tune about a client: how it presents itself
//! to the broker, where the broker is, and how long to wait before retrying
//! a lost connection.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ClientError;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Name shown by the broker and stamped on every message.
    #[serde(default = "default_name")]
    pub name: String,

    /// Free-form description sent with the config handshake.
    #[serde(default)]
    pub description: String,

    /// Broker address, e.g. `ws://localhost:9000`.
    #[serde(default = "default_address")]
    pub address: String,

    /// Delay before reconnecting after a lost connection, in milliseconds.
    /// Zero disables automatic reconnects.
    #[serde(default = "default_reconnect_timeout")]
    pub reconnect_timeout_ms: u64,
}

// Default value functions
fn default_name() -> String {
    "brew-client".to_string()
}

fn default_address() -> String {
    "ws://127.0.0.1:9000".to_string()
}

fn default_reconnect_timeout() -> u64 {
    1000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: String::new(),
            address: default_address(),
            reconnect_timeout_ms: default_reconnect_timeout(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for `name` talking to `address`.
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            ..Default::default()
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the reconnect timeout.
    #[must_use]
    pub fn with_reconnect_timeout(mut self, timeout: Duration) -> Self {
        self.reconnect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// The reconnect timeout as a duration.
    #[must_use]
    pub fn reconnect_timeout(&self) -> Duration {
        Duration::from_millis(self.reconnect_timeout_ms)
    }

    /// Parse a configuration from TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this structure.
    pub fn from_toml_str(text: &str) -> Result<Self, ClientError> {
        Ok(toml::from_str(text)?)
    }
}
