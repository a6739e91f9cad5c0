//! Client instrumentation.
//!
//! Recorded through the `metrics` facade. Nothing is exported unless the
//! application installs a recorder.

use metrics::{counter, gauge};

/// Metric names.
pub mod names {
    pub const MESSAGES_TOTAL: &str = "brew_messages_total";
    pub const MESSAGES_DROPPED_TOTAL: &str = "brew_messages_dropped_total";
    pub const DECODE_ERRORS_TOTAL: &str = "brew_decode_errors_total";
    pub const HANDLER_PANICS_TOTAL: &str = "brew_handler_panics_total";
    pub const CONNECTIONS_TOTAL: &str = "brew_connections_total";
    pub const RECONNECT_ATTEMPTS_TOTAL: &str = "brew_reconnect_attempts_total";
    pub const CONNECTED: &str = "brew_connected";
}

/// Describe the client metrics to the installed recorder.
pub fn describe_metrics() {
    metrics::describe_counter!(names::MESSAGES_TOTAL, "Messages sent and received");
    metrics::describe_counter!(
        names::MESSAGES_DROPPED_TOTAL,
        "Outgoing messages discarded before reaching the transport"
    );
    metrics::describe_counter!(names::DECODE_ERRORS_TOTAL, "Inbound messages that failed to decode");
    metrics::describe_counter!(names::HANDLER_PANICS_TOTAL, "Subscriber handlers that panicked");
    metrics::describe_counter!(names::CONNECTIONS_TOTAL, "Connections established");
    metrics::describe_counter!(
        names::RECONNECT_ATTEMPTS_TOTAL,
        "Automatic reconnect attempts after a lost connection"
    );
    metrics::describe_gauge!(names::CONNECTED, "1 while connected to a broker");
}

/// Record a message crossing the transport.
pub fn record_message(direction: &str) {
    counter!(names::MESSAGES_TOTAL, "direction" => direction.to_string()).increment(1);
}

/// Record an outgoing message that was discarded.
pub fn record_dropped(reason: &str) {
    counter!(names::MESSAGES_DROPPED_TOTAL, "reason" => reason.to_string()).increment(1);
}

/// Record an inbound message that could not be decoded.
pub fn record_decode_error() {
    counter!(names::DECODE_ERRORS_TOTAL).increment(1);
}

/// Record a panicking subscriber handler.
pub fn record_handler_panic() {
    counter!(names::HANDLER_PANICS_TOTAL).increment(1);
}

/// Record an established connection.
pub fn record_connected() {
    counter!(names::CONNECTIONS_TOTAL).increment(1);
    gauge!(names::CONNECTED).set(1.0);
}

/// Record a closed connection.
pub fn record_disconnected() {
    gauge!(names::CONNECTED).set(0.0);
}

/// Record an automatic reconnect attempt.
pub fn record_reconnect_attempt() {
    counter!(names::RECONNECT_ATTEMPTS_TOTAL).increment(1);
}
