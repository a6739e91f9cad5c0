//! Connection lifecycle state machine.
//!
//! The machine performs no I/O. The client feeds it commands and transport
//! events and carries out the decisions it returns: open a handle, close a
//! handle, reconnect now, or schedule a retry.
//!
//! Two counters keep stale work from acting:
//!
//! - the *handle generation* identifies the transport handle that produced
//!   an event; events from a replaced handle are ignored.
//! - the *retry epoch* identifies a scheduled retry; any newer explicit
//!   `connect`, `disconnect` or `reconnect` invalidates it.

use std::fmt;
use std::time::Duration;
use tracing::{debug, trace};

/// Connection states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnecting => "disconnecting",
        };
        f.write_str(s)
    }
}

/// What the client should do after the transport reported a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The event came from a replaced handle.
    Ignored,
    /// Stay disconnected.
    Idle,
    /// A reconnect was requested; connect again right away.
    ReconnectNow,
    /// The connection was lost; connect again after `delay` if `epoch` is
    /// still current then.
    RetryAfter { epoch: u64, delay: Duration },
}

/// What the client should do after `reconnect()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectAction {
    /// Close the live handle; the close event will trigger the connect.
    CloseHandle,
    /// Nothing is open or in flight; connect right away.
    ConnectNow,
    /// A connect or disconnect is in flight; the request waits for its
    /// close event.
    Pending,
}

/// The connection lifecycle.
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    reconnect_requested: bool,
    handle_generation: u64,
    retry_epoch: u64,
    retry_timeout: Duration,
}

impl ConnectionMachine {
    /// Create a disconnected machine. A zero timeout disables automatic
    /// retry after a lost connection.
    #[must_use]
    pub fn new(retry_timeout: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reconnect_requested: false,
            handle_generation: 0,
            retry_epoch: 0,
            retry_timeout,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Generation of the current (or most recent) transport handle.
    #[must_use]
    pub fn handle_generation(&self) -> u64 {
        self.handle_generation
    }

    #[must_use]
    pub fn retry_timeout(&self) -> Duration {
        self.retry_timeout
    }

    pub fn set_retry_timeout(&mut self, timeout: Duration) {
        self.retry_timeout = timeout;
    }

    #[must_use]
    pub fn reconnect_requested(&self) -> bool {
        self.reconnect_requested
    }

    /// Start connecting.
    ///
    /// Returns the generation to tag the new handle with, or `None` if not
    /// disconnected.
    pub fn begin_connect(&mut self) -> Option<u64> {
        self.retry_epoch += 1;
        if self.state != ConnectionState::Disconnected {
            trace!(state = %self.state, "Connect ignored");
            return None;
        }
        self.handle_generation += 1;
        self.state = ConnectionState::Connecting;
        debug!(generation = self.handle_generation, "Connecting");
        Some(self.handle_generation)
    }

    /// The transport refused to open the handle for `generation`.
    pub fn open_failed(&mut self, generation: u64) {
        if generation == self.handle_generation && self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Disconnected;
        }
    }

    /// The transport opened. Returns `true` if the connection is now live.
    pub fn on_opened(&mut self, generation: u64) -> bool {
        if generation != self.handle_generation || self.state != ConnectionState::Connecting {
            trace!(generation, state = %self.state, "Stale open event");
            return false;
        }
        self.state = ConnectionState::Connected;
        true
    }

    /// Start a local disconnect. Returns `true` if the handle should be
    /// closed.
    pub fn begin_disconnect(&mut self) -> bool {
        self.retry_epoch += 1;
        if self.state != ConnectionState::Connected {
            trace!(state = %self.state, "Disconnect ignored");
            return false;
        }
        self.state = ConnectionState::Disconnecting;
        true
    }

    /// Request a reconnect.
    pub fn request_reconnect(&mut self) -> ReconnectAction {
        self.reconnect_requested = true;
        if self.begin_disconnect() {
            return ReconnectAction::CloseHandle;
        }
        if self.state == ConnectionState::Disconnected {
            self.reconnect_requested = false;
            return ReconnectAction::ConnectNow;
        }
        ReconnectAction::Pending
    }

    /// The transport closed the handle for `generation`.
    pub fn on_closed(&mut self, generation: u64) -> CloseOutcome {
        if generation != self.handle_generation || self.state == ConnectionState::Disconnected {
            trace!(generation, state = %self.state, "Stale close event");
            return CloseOutcome::Ignored;
        }

        let previous = self.state;
        self.state = ConnectionState::Disconnected;

        if self.reconnect_requested {
            self.reconnect_requested = false;
            return CloseOutcome::ReconnectNow;
        }

        if previous != ConnectionState::Disconnecting && !self.retry_timeout.is_zero() {
            self.retry_epoch += 1;
            return CloseOutcome::RetryAfter {
                epoch: self.retry_epoch,
                delay: self.retry_timeout,
            };
        }

        CloseOutcome::Idle
    }

    /// Whether a retry scheduled with `epoch` should still connect.
    #[must_use]
    pub fn retry_is_current(&self, epoch: u64) -> bool {
        epoch == self.retry_epoch && self.state == ConnectionState::Disconnected
    }
}
