//! # brew-core
//!
//! Core building blocks of a Spacebrew client.
//!
//! This crate provides the parts that carry state but no I/O:
//!
//! - **Registry** - Declared publishers, subscribers and subscriber handlers
//! - **Transform** - Range remapping, low-pass smoothing and the change-only gate
//! - **Connection** - The connect/disconnect/reconnect state machine
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Application │────▶│  Registry   │────▶│   Codec     │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                                       │
//!        ▼                                       ▼
//! ┌─────────────┐                        ┌─────────────┐
//! │  Transform  │───────────────────────▶│ Connection  │
//! └─────────────┘                        └─────────────┘
//! ```

pub mod connection;
pub mod registry;
pub mod transform;

pub use connection::{CloseOutcome, ConnectionMachine, ConnectionState, ReconnectAction};
pub use registry::{Registry, RegistrySnapshot, SubscriberHandler};
pub use transform::{ChangeGate, LowPassFilter, RangeMapping, RangeTransform, DEFAULT_LOW_PASS_ALPHA};
