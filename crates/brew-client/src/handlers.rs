//! Connection lifecycle callbacks.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

use crate::metrics;

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectReason {
    /// WebSocket close code.
    pub code: u16,
    /// Close reason, possibly empty.
    pub reason: String,
    /// Whether the broker or the network ended the connection.
    pub remote: bool,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "code {}", self.code)
        } else {
            write!(f, "code {}: {}", self.code, self.reason)
        }
    }
}

/// A connection-level error reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionError {
    pub message: String,
}

impl ConnectionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub type OnOpenCallback = Arc<dyn Fn() + Send + Sync>;
pub type OnCloseCallback = Arc<dyn Fn(DisconnectReason) + Send + Sync>;
pub type OnErrorCallback = Arc<dyn Fn(ConnectionError) + Send + Sync>;

/// Callbacks for connection lifecycle events.
///
/// All callbacks are optional. They run on the client's event task, never
/// while the client holds its internal lock, so they may call back into the
/// client.
///
/// ```rust,ignore
/// let handlers = EventHandlers::new()
///     .on_open(|| println!("connected"))
///     .on_close(|reason| println!("closed: {}", reason))
///     .on_error(|error| eprintln!("error: {}", error));
/// ```
#[derive(Clone, Default)]
pub struct EventHandlers {
    on_open: Option<OnOpenCallback>,
    on_close: Option<OnCloseCallback>,
    on_error: Option<OnErrorCallback>,
}

impl EventHandlers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called after the connection opened and the config was announced.
    #[must_use]
    pub fn on_open(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Arc::new(f));
        self
    }

    /// Called whenever a connection ends, before any reconnect.
    #[must_use]
    pub fn on_close(mut self, f: impl Fn(DisconnectReason) + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(f));
        self
    }

    /// Called for transport errors and failed connection attempts.
    #[must_use]
    pub fn on_error(mut self, f: impl Fn(ConnectionError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub(crate) fn emit_open(&self) {
        if let Some(f) = &self.on_open {
            guarded("on_open", || f());
        }
    }

    pub(crate) fn emit_close(&self, reason: DisconnectReason) {
        if let Some(f) = &self.on_close {
            guarded("on_close", || f(reason));
        }
    }

    pub(crate) fn emit_error(&self, error: ConnectionError) {
        if let Some(f) = &self.on_error {
            guarded("on_error", || f(error));
        }
    }
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Run an application callback, containing any panic.
pub(crate) fn guarded(callback: &str, f: impl FnOnce()) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(_) => {
            error!(callback = %callback, "Callback panicked");
            metrics::record_handler_panic();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_missing_callbacks_are_noops() {
        let handlers = EventHandlers::new();
        handlers.emit_open();
        handlers.emit_close(DisconnectReason {
            code: 1000,
            reason: String::new(),
            remote: false,
        });
        handlers.emit_error(ConnectionError::new("boom"));
    }

    #[test]
    fn test_panicking_callback_is_contained() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handlers = EventHandlers::new()
            .on_open(|| panic!("open handler failed"))
            .on_error(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        handlers.emit_open();
        handlers.emit_error(ConnectionError::new("after panic"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disconnect_reason_display() {
        let reason = DisconnectReason {
            code: 1006,
            reason: "connection lost".into(),
            remote: true,
        };
        assert_eq!(reason.to_string(), "code 1006: connection lost");
    }
}
