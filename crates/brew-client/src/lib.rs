//! # brew-client
//!
//! A client for Spacebrew-style publish/subscribe brokers.
//!
//! The client declares named, typed publishers and subscribers, announces
//! them to the broker whenever it connects, routes inbound messages to
//! subscriber handlers and reconnects after a lost connection.
//!
//! ## Example
//!
//! ```rust,ignore
//! use brew_client::{BooleanPublisher, BrewClient, ClientConfig, EventHandlers, Publish};
//!
//! let client = BrewClient::new(ClientConfig::new("lamp", "ws://localhost:9000"), EventHandlers::new());
//! client.subscribe_boolean("power", |on| println!("power: {}", on));
//! let mut button = BooleanPublisher::new(&client, "button", false);
//! client.connect()?;
//!
//! // later, once connected
//! button.publish(true)?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod publisher;

pub use brew_core::{ConnectionState, RegistrySnapshot, SubscriberHandler};
pub use brew_protocol::{MessageType, Value};
pub use client::BrewClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use handlers::{ConnectionError, DisconnectReason, EventHandlers};
pub use publisher::{BooleanPublisher, Publish, RangePublisher, StringPublisher, ValuePublisher};
