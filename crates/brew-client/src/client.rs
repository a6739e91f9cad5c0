//! The client facade.
//!
//! A [`BrewClient`] owns the registry, the connection state machine and the
//! live transport handle. Transport events arrive on an internal channel and
//! are processed by one dispatcher task per client, so subscriber handlers
//! and lifecycle callbacks always run one at a time and in arrival order.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use brew_core::{
    CloseOutcome, ConnectionMachine, ConnectionState, ReconnectAction, Registry, RegistrySnapshot,
    SubscriberHandler,
};
use brew_protocol::{decode_message, MessageCodec, MessageType, Value};
use brew_transport::{Connector, EventSink, TaggedEvent, TransportEvent, TransportHandle};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::handlers::{guarded, ConnectionError, DisconnectReason, EventHandlers};
use crate::metrics;

/// A Spacebrew client.
///
/// Cheap to clone; clones share one connection and one registry.
#[derive(Clone)]
pub struct BrewClient {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<ClientState>,
    connector: Arc<dyn Connector>,
    handlers: EventHandlers,
    events_tx: mpsc::UnboundedSender<TaggedEvent>,
    // Dropping this stops the dispatcher.
    _shutdown: oneshot::Sender<()>,
}

struct ClientState {
    codec: MessageCodec,
    address: String,
    current_address: Option<String>,
    registry: Registry,
    machine: ConnectionMachine,
    handle: Option<Box<dyn TransportHandle>>,
}

impl ClientState {
    fn send_text(&self, text: String) -> Result<(), ClientError> {
        let handle = self.handle.as_ref().ok_or(ClientError::NotConnected)?;
        handle.send(text)?;
        metrics::record_message("outbound");
        Ok(())
    }

    /// Send the config handshake if connected.
    fn announce(&self) {
        if !self.machine.is_connected() {
            return;
        }

        let snapshot = self.registry.snapshot();
        let result = self
            .codec
            .encode_config(&snapshot.publishers, &snapshot.subscribers)
            .map_err(ClientError::from)
            .and_then(|text| self.send_text(text));

        match result {
            Ok(()) => debug!(
                client = %self.codec.client_name(),
                publishers = snapshot.publishers.len(),
                subscribers = snapshot.subscribers.len(),
                "Announced config"
            ),
            Err(e) => error!("Failed to announce config: {}", e),
        }
    }
}

impl BrewClient {
    /// Create a client that reaches the broker over WebSocket.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[cfg(feature = "websocket")]
    pub fn new(config: ClientConfig, handlers: EventHandlers) -> Self {
        Self::with_connector(
            config,
            Arc::new(brew_transport::WebSocketConnector::default()),
            handlers,
        )
    }

    /// Create a client on top of `connector`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn with_connector(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        handlers: EventHandlers,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let state = ClientState {
            codec: MessageCodec::new(config.name.clone(), config.description.clone()),
            address: config.address.clone(),
            current_address: None,
            registry: Registry::new(),
            machine: ConnectionMachine::new(config.reconnect_timeout()),
            handle: None,
        };

        let inner = Arc::new(Inner {
            state: Mutex::new(state),
            connector,
            handlers,
            events_tx,
            _shutdown: shutdown_tx,
        });

        tokio::spawn(dispatch_events(Arc::downgrade(&inner), events_rx, shutdown_rx));

        debug!(client = %config.name, address = %config.address, "Created client");
        Self { inner }
    }

    fn lock(&self) -> MutexGuard<'_, ClientState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Open a connection to the configured address.
    ///
    /// Does nothing unless disconnected. The handshake completes in the
    /// background; the open callback fires once the config was announced.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport refused to open the address. The
    /// error callback fires as well.
    pub fn connect(&self) -> Result<(), ClientError> {
        self.open_connection(None)
    }

    fn open_connection(&self, retry_epoch: Option<u64>) -> Result<(), ClientError> {
        let failure = {
            let mut state = self.lock();
            if let Some(epoch) = retry_epoch {
                if !state.machine.retry_is_current(epoch) {
                    trace!(epoch, "Retry superseded");
                    return Ok(());
                }
                metrics::record_reconnect_attempt();
            }

            let Some(generation) = state.machine.begin_connect() else {
                trace!(state = %state.machine.state(), "Connect ignored");
                return Ok(());
            };

            let address = state.address.clone();
            info!(
                address = %address,
                transport = %self.inner.connector.name(),
                "Connecting to broker"
            );

            let sink = EventSink::new(generation, self.inner.events_tx.clone());
            match self.inner.connector.open(&address, sink) {
                Ok(handle) => {
                    state.handle = Some(handle);
                    state.current_address = Some(address);
                    return Ok(());
                }
                Err(e) => {
                    state.machine.open_failed(generation);
                    error!(address = %address, "Failed to open connection: {}", e);
                    e
                }
            }
        };

        self.inner
            .handlers
            .emit_error(ConnectionError::new(failure.to_string()));
        Err(failure.into())
    }

    /// Close the connection.
    ///
    /// Does nothing unless connected. Either way a pending automatic
    /// reconnect is cancelled. The close callback fires once the transport
    /// reports the close.
    pub fn disconnect(&self) {
        let mut state = self.lock();
        if !state.machine.begin_disconnect() {
            return;
        }

        info!(address = ?state.current_address, "Disconnecting from broker");
        if let Some(handle) = state.handle.take() {
            handle.close();
        }
    }

    /// Close the connection and open a new one, picking up address changes.
    ///
    /// Connects right away when nothing is open.
    ///
    /// # Errors
    ///
    /// Returns an error if an immediate connect was refused by the
    /// transport.
    pub fn reconnect(&self) -> Result<(), ClientError> {
        let action = {
            let mut state = self.lock();
            let action = state.machine.request_reconnect();
            if action == ReconnectAction::CloseHandle {
                info!(address = ?state.current_address, "Reconnecting");
                if let Some(handle) = state.handle.take() {
                    handle.close();
                }
            }
            action
        };

        match action {
            ReconnectAction::ConnectNow => self.connect(),
            ReconnectAction::CloseHandle | ReconnectAction::Pending => Ok(()),
        }
    }

    fn schedule_retry(&self, epoch: u64, delay: Duration) {
        info!(delay_ms = delay.as_millis() as u64, "Connection lost, retrying");
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let client = BrewClient { inner };
            if let Err(e) = client.open_connection(Some(epoch)) {
                warn!("Reconnect attempt failed: {}", e);
            }
        });
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.lock().machine.state()
    }

    /// Whether the connection is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.lock().machine.is_connected()
    }

    // ---------------------------------------------------------------------
    // Transport events
    // ---------------------------------------------------------------------

    fn handle_transport_event(&self, generation: u64, event: TransportEvent) {
        match event {
            TransportEvent::Opened => self.handle_opened(generation),
            TransportEvent::Text(text) => {
                if self.lock().machine.handle_generation() != generation {
                    trace!(generation, "Dropping text from a replaced connection");
                    return;
                }
                self.on_transport_message(&text);
            }
            TransportEvent::Error(message) => {
                if self.lock().machine.handle_generation() != generation {
                    return;
                }
                warn!(error = %message, "Transport error");
                self.inner.handlers.emit_error(ConnectionError::new(message));
            }
            TransportEvent::Closed {
                code,
                reason,
                remote,
            } => self.handle_closed(generation, DisconnectReason { code, reason, remote }),
        }
    }

    fn handle_opened(&self, generation: u64) {
        {
            let mut state = self.lock();
            if !state.machine.on_opened(generation) {
                trace!(generation, "Ignoring open of a replaced connection");
                return;
            }
            info!(address = ?state.current_address, "Connected to broker");
            metrics::record_connected();
            state.announce();
        }
        self.inner.handlers.emit_open();
    }

    fn handle_closed(&self, generation: u64, reason: DisconnectReason) {
        let outcome = {
            let mut state = self.lock();
            let outcome = state.machine.on_closed(generation);
            if outcome != CloseOutcome::Ignored {
                state.handle = None;
            }
            outcome
        };

        if outcome == CloseOutcome::Ignored {
            return;
        }

        info!(code = reason.code, remote = reason.remote, "Connection closed");
        metrics::record_disconnected();
        self.inner.handlers.emit_close(reason);

        match outcome {
            CloseOutcome::ReconnectNow => {
                if let Err(e) = self.connect() {
                    warn!("Reconnect failed: {}", e);
                }
            }
            CloseOutcome::RetryAfter { epoch, delay } => self.schedule_retry(epoch, delay),
            CloseOutcome::Idle | CloseOutcome::Ignored => {}
        }
    }

    /// Process one inbound text frame.
    ///
    /// Decodes it and hands the value to the handler bound to its name and
    /// type. Malformed text and messages nobody subscribed to are dropped.
    /// A panicking handler is logged and does not affect later messages.
    pub fn on_transport_message(&self, text: &str) {
        metrics::record_message("inbound");

        let message = match decode_message(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Dropping malformed message");
                metrics::record_decode_error();
                return;
            }
        };

        let message_type = message.message_type();
        let handler = self.lock().registry.handler(&message.name, message_type);
        let Some(handler) = handler else {
            trace!(name = %message.name, message_type = %message_type, "No handler bound");
            return;
        };

        trace!(
            from = ?message.client_name,
            name = %message.name,
            message_type = %message_type,
            "Dispatching message"
        );
        let value = message.value;
        guarded("subscriber", || handler(value));
    }

    // ---------------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------------

    /// Declare a publisher. Its type comes from `default`.
    ///
    /// Re-announces the config when connected.
    pub fn add_publisher(&self, name: &str, default: impl Into<Value>) {
        let default = default.into();
        let mut state = self.lock();
        if state.registry.declare_publisher(name, &default) {
            state.announce();
        }
    }

    /// Declare a subscriber without a handler.
    ///
    /// The broker can still route to it; inbound messages are dropped until a
    /// handler is bound.
    pub fn add_subscriber(&self, name: &str, message_type: MessageType) {
        self.subscribe_with(name, message_type, None);
    }

    /// Declare a subscriber and bind `handler` to it, replacing any earlier
    /// handler for the same name and type.
    pub fn subscribe(&self, name: &str, message_type: MessageType, handler: SubscriberHandler) {
        self.subscribe_with(name, message_type, Some(handler));
    }

    /// Subscribe to a boolean channel.
    pub fn subscribe_boolean(&self, name: &str, f: impl Fn(bool) + Send + Sync + 'static) {
        self.subscribe(
            name,
            MessageType::Boolean,
            Arc::new(move |value| {
                if let Value::Boolean(b) = value {
                    f(b)
                }
            }),
        );
    }

    /// Subscribe to a range channel.
    pub fn subscribe_range(&self, name: &str, f: impl Fn(u16) + Send + Sync + 'static) {
        self.subscribe(
            name,
            MessageType::Range,
            Arc::new(move |value| {
                if let Value::Range(r) = value {
                    f(r)
                }
            }),
        );
    }

    /// Subscribe to a string channel.
    pub fn subscribe_string(&self, name: &str, f: impl Fn(String) + Send + Sync + 'static) {
        self.subscribe(
            name,
            MessageType::String,
            Arc::new(move |value| {
                if let Value::String(s) = value {
                    f(s)
                }
            }),
        );
    }

    fn subscribe_with(&self, name: &str, message_type: MessageType, handler: Option<SubscriberHandler>) {
        let mut state = self.lock();
        let known = state.registry.subscriber(name, message_type).is_some();
        state.registry.declare_subscriber(name, message_type, handler);
        if !known {
            state.announce();
        }
    }

    /// Remove a publisher. Returns whether it existed.
    pub fn remove_publisher(&self, name: &str, message_type: MessageType) -> bool {
        let mut state = self.lock();
        let removed = state.registry.remove_publisher(name, message_type);
        if removed {
            state.announce();
        }
        removed
    }

    /// Remove a subscriber and its handler. Returns whether it existed.
    pub fn remove_subscriber(&self, name: &str, message_type: MessageType) -> bool {
        let mut state = self.lock();
        let removed = state.registry.remove_subscriber(name, message_type);
        if removed {
            state.announce();
        }
        removed
    }

    /// The declared publishers and subscribers.
    #[must_use]
    pub fn declarations(&self) -> RegistrySnapshot {
        self.lock().registry.snapshot()
    }

    // ---------------------------------------------------------------------
    // Publishing
    // ---------------------------------------------------------------------

    /// Send `value` on the publisher `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnknownPublisher`] if no publisher with this
    /// name and the value's type was declared, and
    /// [`ClientError::NotConnected`] while disconnected. Nothing is queued
    /// in either case.
    pub fn send(&self, name: &str, value: impl Into<Value>) -> Result<(), ClientError> {
        let value = value.into();
        let message_type = value.message_type();
        let state = self.lock();

        if !state.registry.has_publisher(name, message_type) {
            warn!(name = %name, message_type = %message_type, "Send on unknown publisher");
            metrics::record_dropped("unknown_publisher");
            return Err(ClientError::UnknownPublisher {
                name: name.to_string(),
                message_type,
            });
        }

        if !state.machine.is_connected() {
            debug!(name = %name, "Could not send message, not connected");
            metrics::record_dropped("disconnected");
            return Err(ClientError::NotConnected);
        }

        let text = state.codec.encode_message(name, &value)?;
        trace!(name = %name, value = %value, "Sending message");
        state.send_text(text)
    }

    // ---------------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------------

    /// Client name.
    #[must_use]
    pub fn name(&self) -> String {
        self.lock().codec.client_name().to_string()
    }

    /// Change the client name. Takes effect with the next config announcement.
    pub fn set_name(&self, name: impl Into<String>) {
        self.lock().codec.set_client_name(name);
    }

    /// Client description.
    #[must_use]
    pub fn description(&self) -> String {
        self.lock().codec.description().to_string()
    }

    /// Change the description. Takes effect with the next config
    /// announcement.
    pub fn set_description(&self, description: impl Into<String>) {
        self.lock().codec.set_description(description);
    }

    /// The address the next connect will use.
    #[must_use]
    pub fn address(&self) -> String {
        self.lock().address.clone()
    }

    /// Change the broker address. Takes effect with the next connect.
    pub fn set_address(&self, address: impl Into<String>) {
        self.lock().address = address.into();
    }

    /// The address of the most recent connection attempt.
    #[must_use]
    pub fn current_address(&self) -> Option<String> {
        self.lock().current_address.clone()
    }

    /// Delay before reconnecting after a lost connection.
    #[must_use]
    pub fn reconnect_timeout(&self) -> Duration {
        self.lock().machine.retry_timeout()
    }

    /// Change the reconnect delay. Zero disables automatic reconnects.
    pub fn set_reconnect_timeout(&self, timeout: Duration) {
        self.lock().machine.set_retry_timeout(timeout);
    }
}

impl fmt::Debug for BrewClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("BrewClient")
            .field("name", &state.codec.client_name())
            .field("address", &state.address)
            .field("state", &state.machine.state())
            .field("registry", &state.registry)
            .finish()
    }
}

async fn dispatch_events(
    client: Weak<Inner>,
    mut events: mpsc::UnboundedReceiver<TaggedEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        let (generation, event) = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            next = events.recv() => match next {
                Some(tagged) => tagged,
                None => break,
            },
        };

        let Some(inner) = client.upgrade() else {
            break;
        };
        BrewClient { inner }.handle_transport_event(generation, event);
    }

    debug!("Event dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use brew_transport::LoopbackConnector;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ADDRESS: &str = "ws://broker.test:9000";

    fn client_with(timeout: Duration, handlers: EventHandlers) -> (BrewClient, LoopbackConnector) {
        let connector = LoopbackConnector::new();
        let config = ClientConfig::new("test-client", ADDRESS)
            .with_description("unit test")
            .with_reconnect_timeout(timeout);
        let client = BrewClient::with_connector(config, Arc::new(connector.clone()), handlers);
        (client, connector)
    }

    fn client(timeout: Duration) -> (BrewClient, LoopbackConnector) {
        client_with(timeout, EventHandlers::new())
    }

    /// Let the dispatcher and any spawned tasks drain.
    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    async fn connected(client: &BrewClient, connector: &LoopbackConnector) {
        client.connect().unwrap();
        assert!(connector.accept());
        settle().await;
        assert!(client.is_connected());
    }

    fn parse(text: &str) -> serde_json::Value {
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn test_connect_announces_config() {
        let opens = Arc::new(AtomicUsize::new(0));
        let counter = opens.clone();
        let (client, connector) = client_with(
            Duration::from_secs(1),
            EventHandlers::new().on_open(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        client.add_publisher("switch", false);
        client.subscribe_range("dial", |_| {});

        client.connect().unwrap();
        assert_eq!(client.state(), ConnectionState::Connecting);
        assert_eq!(connector.opened_addresses(), vec![ADDRESS.to_string()]);
        assert_eq!(client.current_address().as_deref(), Some(ADDRESS));
        assert!(connector.sent().is_empty());

        connector.accept();
        settle().await;

        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(opens.load(Ordering::SeqCst), 1);

        let sent = connector.take_sent();
        assert_eq!(sent.len(), 1);
        let config = parse(&sent[0]);
        assert_eq!(config["config"]["name"], "test-client");
        assert_eq!(config["config"]["description"], "unit test");
        assert_eq!(
            config["config"]["publish"]["messages"][0],
            serde_json::json!({"name": "switch", "type": "boolean", "default": "false"})
        );
        assert_eq!(
            config["config"]["subscribe"]["messages"][0],
            serde_json::json!({"name": "dial", "type": "range"})
        );
    }

    #[tokio::test]
    async fn test_connect_twice_is_noop() {
        let (client, connector) = client(Duration::from_secs(1));
        connected(&client, &connector).await;

        client.connect().unwrap();
        assert_eq!(connector.open_count(), 1);
    }

    #[tokio::test]
    async fn test_send_unknown_publisher() {
        let (client, connector) = client(Duration::from_secs(1));
        client.add_publisher("level", 0i64);
        connected(&client, &connector).await;
        connector.take_sent();

        let result = client.send("level", "loud");
        assert!(matches!(
            result,
            Err(ClientError::UnknownPublisher { ref name, message_type: MessageType::String }) if name == "level"
        ));
        assert!(matches!(
            client.send("missing", true),
            Err(ClientError::UnknownPublisher { .. })
        ));
        assert!(connector.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_while_disconnected() {
        let (client, connector) = client(Duration::from_secs(1));
        client.add_publisher("switch", false);

        assert!(matches!(client.send("switch", true), Err(ClientError::NotConnected)));
        assert!(connector.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_encodes_message() {
        let (client, connector) = client(Duration::from_secs(1));
        client.add_publisher("level", 0i64);
        connected(&client, &connector).await;
        connector.take_sent();

        client.send("level", 2000i64).unwrap();

        let sent = connector.take_sent();
        assert_eq!(
            parse(&sent[0]),
            serde_json::json!({"message": {
                "clientName": "test-client",
                "name": "level",
                "type": "range",
                "value": "1023"
            }})
        );
    }

    #[tokio::test]
    async fn test_registration_while_connected_reannounces() {
        let (client, connector) = client(Duration::from_secs(1));
        connected(&client, &connector).await;
        connector.take_sent();

        client.add_publisher("time", "");
        client.add_subscriber("counter", MessageType::Range);
        // Same declaration again changes nothing
        client.add_publisher("time", "");

        let sent = connector.take_sent();
        assert_eq!(sent.len(), 2);
        let latest = parse(&sent[1]);
        assert_eq!(latest["config"]["publish"]["messages"][0]["name"], "time");
        assert_eq!(latest["config"]["subscribe"]["messages"][0]["name"], "counter");

        assert!(client.remove_publisher("time", MessageType::String));
        assert!(!client.remove_publisher("time", MessageType::String));
        let sent = connector.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            parse(&sent[0])["config"]["publish"]["messages"],
            serde_json::json!([])
        );
    }

    #[tokio::test]
    async fn test_inbound_dispatch_by_name_and_type() {
        let (client, connector) = client(Duration::from_secs(1));
        let ranges = Arc::new(Mutex::new(Vec::new()));
        let strings = Arc::new(Mutex::new(Vec::new()));

        let sink = ranges.clone();
        client.subscribe_range("counter", move |v| sink.lock().unwrap().push(v));
        let sink = strings.clone();
        client.subscribe_string("counter", move |v| sink.lock().unwrap().push(v));
        connected(&client, &connector).await;

        connector.deliver(
            r#"{"message":{"clientName":"other","name":"counter","type":"range","value":"2000"}}"#,
        );
        connector.deliver(
            r#"{"message":{"clientName":"other","name":"counter","type":"string","value":"seven"}}"#,
        );
        connector.deliver(r#"{"message":{"name":"counter","type":"boolean","value":"true"}}"#);
        connector.deliver("not json");
        settle().await;

        assert_eq!(*ranges.lock().unwrap(), vec![1023]);
        assert_eq!(*strings.lock().unwrap(), vec!["seven".to_string()]);
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_panicking_handler_does_not_stop_dispatch() {
        let (client, connector) = client(Duration::from_secs(1));
        let received = Arc::new(AtomicUsize::new(0));

        client.subscribe_boolean("switch", |_| panic!("handler failed"));
        let counter = received.clone();
        client.subscribe_boolean("other", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        connected(&client, &connector).await;

        connector.deliver(r#"{"message":{"name":"switch","type":"boolean","value":"true"}}"#);
        connector.deliver(r#"{"message":{"name":"other","type":"boolean","value":"TRUE"}}"#);
        settle().await;

        assert_eq!(received.load(Ordering::SeqCst), 1);
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_removed_subscriber_receives_nothing() {
        let (client, connector) = client(Duration::from_secs(1));
        let received = Arc::new(AtomicUsize::new(0));
        let counter = received.clone();
        client.subscribe_string("time", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(client.remove_subscriber("time", MessageType::String));
        client.on_transport_message(r#"{"message":{"name":"time","type":"string","value":"now"}}"#);
        assert_eq!(received.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_connection_retries_after_timeout() {
        let closes = Arc::new(Mutex::new(Vec::new()));
        let sink = closes.clone();
        let (client, connector) = client_with(
            Duration::from_millis(1000),
            EventHandlers::new().on_close(move |reason| sink.lock().unwrap().push(reason)),
        );
        connected(&client, &connector).await;

        connector.hang_up();
        settle().await;
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(connector.open_count(), 1);
        {
            let closes = closes.lock().unwrap();
            assert_eq!(closes.len(), 1);
            assert!(closes[0].remote);
            assert_eq!(closes[0].code, brew_transport::CLOSE_ABNORMAL);
        }

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(connector.open_count(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        settle().await;
        assert_eq!(connector.open_count(), 2);
        assert_eq!(client.state(), ConnectionState::Connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_never_retries() {
        let (client, connector) = client(Duration::ZERO);
        connected(&client, &connector).await;

        connector.hang_up();
        settle().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;

        assert_eq!(connector.open_count(), 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_cancels_pending_retry() {
        let (client, connector) = client(Duration::from_millis(500));
        connected(&client, &connector).await;

        connector.hang_up();
        settle().await;
        client.disconnect();

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(connector.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_disconnect_does_not_retry() {
        let closes = Arc::new(Mutex::new(Vec::new()));
        let sink = closes.clone();
        let (client, connector) = client_with(
            Duration::from_millis(100),
            EventHandlers::new().on_close(move |reason| sink.lock().unwrap().push(reason)),
        );
        connected(&client, &connector).await;

        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Disconnecting);
        settle().await;
        assert_eq!(client.state(), ConnectionState::Disconnected);

        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(connector.open_count(), 1);

        let closes = closes.lock().unwrap();
        assert_eq!(closes.len(), 1);
        assert!(!closes[0].remote);
    }

    #[tokio::test]
    async fn test_reconnect_uses_new_address() {
        let (client, connector) = client(Duration::from_secs(1));
        client.add_publisher("switch", false);
        connected(&client, &connector).await;
        connector.take_sent();

        client.set_address("ws://elsewhere:9000");
        client.reconnect().unwrap();
        settle().await;

        assert_eq!(connector.open_count(), 2);
        assert_eq!(connector.opened_addresses()[1], "ws://elsewhere:9000");
        assert_eq!(client.state(), ConnectionState::Connecting);

        connector.accept();
        settle().await;
        assert!(client.is_connected());
        assert_eq!(connector.take_sent().len(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_while_idle_connects() {
        let (client, connector) = client(Duration::from_secs(1));
        client.reconnect().unwrap();
        assert_eq!(connector.open_count(), 1);
        assert_eq!(client.state(), ConnectionState::Connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_open_reports_error() {
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = errors.clone();
        let (client, connector) = client_with(
            Duration::from_millis(100),
            EventHandlers::new().on_error(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        connector.refuse_opens(Some("bad address"));

        assert!(matches!(client.connect(), Err(ClientError::Transport(_))));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(errors.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(connector.open_count(), 0);
    }

    #[tokio::test]
    async fn test_settings() {
        let (client, _connector) = client(Duration::from_secs(1));
        assert_eq!(client.name(), "test-client");
        assert_eq!(client.description(), "unit test");
        assert_eq!(client.address(), ADDRESS);
        assert_eq!(client.current_address(), None);

        client.set_name("renamed");
        client.set_description("changed");
        client.set_reconnect_timeout(Duration::from_millis(20));
        assert_eq!(client.name(), "renamed");
        assert_eq!(client.description(), "changed");
        assert_eq!(client.reconnect_timeout(), Duration::from_millis(20));
    }
}
