//! In-process loopback transport.
//!
//! Nothing leaves the process: sent text is recorded, and the owner of the
//! connector decides when the "broker" opens, speaks, or hangs up. Useful for
//! tests and for embedding a client in a host that moves frames itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::traits::{Connector, EventSink, TransportError, TransportEvent, TransportHandle};

#[derive(Debug, Default)]
struct Shared {
    opens: Vec<String>,
    sent: Vec<String>,
    current: Option<EventSink>,
    refuse: Option<String>,
}

/// A connector whose handles talk to the test or host that created it.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct LoopbackConnector {
    shared: Arc<Mutex<Shared>>,
}

impl LoopbackConnector {
    /// Create a connector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every following `open` fail with `reason`, or succeed again with
    /// `None`.
    pub fn refuse_opens(&self, reason: Option<&str>) {
        self.lock().refuse = reason.map(str::to_string);
    }

    /// Number of handles opened so far.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.lock().opens.len()
    }

    /// Addresses passed to `open`, in order.
    #[must_use]
    pub fn opened_addresses(&self) -> Vec<String> {
        self.lock().opens.clone()
    }

    /// All text sent through any handle, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// Take and clear the sent text.
    pub fn take_sent(&self) -> Vec<String> {
        std::mem::take(&mut self.lock().sent)
    }

    /// Deliver an event on the most recently opened handle.
    ///
    /// Returns `false` if no handle was opened or nobody is listening.
    pub fn emit(&self, event: TransportEvent) -> bool {
        match &self.lock().current {
            Some(sink) => sink.emit(event),
            None => false,
        }
    }

    /// The broker accepted the connection.
    pub fn accept(&self) -> bool {
        self.emit(TransportEvent::Opened)
    }

    /// The broker sent text.
    pub fn deliver(&self, text: impl Into<String>) -> bool {
        self.emit(TransportEvent::Text(text.into()))
    }

    /// The broker or network dropped the connection.
    pub fn hang_up(&self) -> bool {
        self.emit(TransportEvent::abnormal_close("connection lost"))
    }
}

impl Connector for LoopbackConnector {
    fn open(&self, address: &str, events: EventSink) -> Result<Box<dyn TransportHandle>, TransportError> {
        let mut shared = self.lock();
        if let Some(reason) = &shared.refuse {
            return Err(TransportError::InvalidAddress {
                address: address.to_string(),
                reason: reason.clone(),
            });
        }

        shared.opens.push(address.to_string());
        shared.current = Some(events.clone());

        Ok(Box::new(LoopbackHandle {
            address: address.to_string(),
            shared: self.shared.clone(),
            events,
            open: AtomicBool::new(true),
        }))
    }

    fn name(&self) -> &'static str {
        "loopback"
    }
}

/// A loopback handle.
pub struct LoopbackHandle {
    address: String,
    shared: Arc<Mutex<Shared>>,
    events: EventSink,
    open: AtomicBool,
}

impl TransportHandle for LoopbackHandle {
    fn send(&self, text: String) -> Result<(), TransportError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed);
        }
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sent
            .push(text);
        Ok(())
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            self.events.emit(TransportEvent::local_close());
        }
    }

    fn address(&self) -> &str {
        &self.address
    }
}

impl Drop for LoopbackHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_loopback_records_and_emits() {
        let connector = LoopbackConnector::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = connector.open("ws://broker", EventSink::new(1, tx)).unwrap();
        assert_eq!(connector.open_count(), 1);
        assert_eq!(connector.opened_addresses(), vec!["ws://broker".to_string()]);

        assert!(connector.accept());
        assert_eq!(rx.try_recv().unwrap(), (1, TransportEvent::Opened));

        handle.send("hello".into()).unwrap();
        assert_eq!(connector.take_sent(), vec!["hello".to_string()]);
        assert!(connector.sent().is_empty());

        handle.close();
        assert_eq!(rx.try_recv().unwrap(), (1, TransportEvent::local_close()));
        assert!(matches!(
            handle.send("late".into()),
            Err(TransportError::ConnectionClosed)
        ));

        // A second close emits nothing
        drop(handle);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_refused_open() {
        let connector = LoopbackConnector::new();
        connector.refuse_opens(Some("unreachable"));
        let (tx, _rx) = mpsc::unbounded_channel();

        assert!(connector.open("ws://broker", EventSink::new(1, tx)).is_err());
        assert_eq!(connector.open_count(), 0);
        assert!(!connector.accept());
    }
}
