//! Publisher and subscriber registry.
//!
//! The registry records every channel a client has declared, keyed by
//! `(name, type)`. A name may be declared with several types; declaring the
//! same pair again replaces the earlier entry.

use brew_protocol::{ChannelDeclaration, MessageType, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A subscriber callback. It receives values already sanitized for the
/// subscriber's type.
pub type SubscriberHandler = Arc<dyn Fn(Value) + Send + Sync>;

type Declarations = BTreeMap<String, BTreeMap<MessageType, ChannelDeclaration>>;

/// Declared publishers and subscribers, and the handlers bound to the latter.
///
/// Every handler entry has a matching subscriber declaration.
#[derive(Default)]
pub struct Registry {
    publishers: Declarations,
    subscribers: Declarations,
    handlers: BTreeMap<String, BTreeMap<MessageType, SubscriberHandler>>,
}

/// An ordered copy of all declarations, sorted by name and then type name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub publishers: Vec<ChannelDeclaration>,
    pub subscribers: Vec<ChannelDeclaration>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a publisher, replacing any with the same name and type.
    ///
    /// Returns `true` if the registry changed.
    pub fn declare_publisher(&mut self, name: &str, default: &Value) -> bool {
        let decl = ChannelDeclaration::publisher(name, default);
        let message_type = decl.message_type;
        let previous = self
            .publishers
            .entry(name.to_string())
            .or_default()
            .insert(message_type, decl.clone());

        debug!(name = %name, message_type = %message_type, default = %default, "Declared publisher");
        previous.as_ref() != Some(&decl)
    }

    /// Declare a subscriber and optionally bind its handler.
    ///
    /// Re-declaring without a handler keeps a handler bound earlier.
    /// Returns `true` if a handler is bound after the call.
    pub fn declare_subscriber(
        &mut self,
        name: &str,
        message_type: MessageType,
        handler: Option<SubscriberHandler>,
    ) -> bool {
        self.subscribers
            .entry(name.to_string())
            .or_default()
            .insert(message_type, ChannelDeclaration::subscriber(name, message_type));

        if let Some(handler) = handler {
            self.handlers
                .entry(name.to_string())
                .or_default()
                .insert(message_type, handler);
        }

        let bound = self.has_handler(name, message_type);
        debug!(name = %name, message_type = %message_type, bound, "Declared subscriber");
        bound
    }

    /// Remove a publisher.
    ///
    /// Returns `true` if it was declared.
    pub fn remove_publisher(&mut self, name: &str, message_type: MessageType) -> bool {
        let removed = remove_entry(&mut self.publishers, name, message_type).is_some();
        if removed {
            debug!(name = %name, message_type = %message_type, "Removed publisher");
        }
        removed
    }

    /// Remove a subscriber together with its handler.
    ///
    /// Returns `true` if it was declared.
    pub fn remove_subscriber(&mut self, name: &str, message_type: MessageType) -> bool {
        let removed = remove_entry(&mut self.subscribers, name, message_type).is_some();
        remove_entry(&mut self.handlers, name, message_type);
        if removed {
            debug!(name = %name, message_type = %message_type, "Removed subscriber");
        }
        removed
    }

    /// Look up a publisher declaration.
    #[must_use]
    pub fn publisher(&self, name: &str, message_type: MessageType) -> Option<&ChannelDeclaration> {
        self.publishers.get(name)?.get(&message_type)
    }

    /// Look up a subscriber declaration.
    #[must_use]
    pub fn subscriber(&self, name: &str, message_type: MessageType) -> Option<&ChannelDeclaration> {
        self.subscribers.get(name)?.get(&message_type)
    }

    /// Check whether a publisher with this name and type is declared.
    #[must_use]
    pub fn has_publisher(&self, name: &str, message_type: MessageType) -> bool {
        self.publisher(name, message_type).is_some()
    }

    /// Check whether a handler is bound for this name and type.
    #[must_use]
    pub fn has_handler(&self, name: &str, message_type: MessageType) -> bool {
        self.handlers
            .get(name)
            .is_some_and(|by_type| by_type.contains_key(&message_type))
    }

    /// Get the handler bound to a subscriber, if any.
    #[must_use]
    pub fn handler(&self, name: &str, message_type: MessageType) -> Option<SubscriberHandler> {
        self.handlers.get(name)?.get(&message_type).cloned()
    }

    /// Number of declared publishers.
    #[must_use]
    pub fn publisher_count(&self) -> usize {
        self.publishers.values().map(BTreeMap::len).sum()
    }

    /// Number of declared subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.values().map(BTreeMap::len).sum()
    }

    /// Get all declarations in deterministic order.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            publishers: flatten(&self.publishers),
            subscribers: flatten(&self.subscribers),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("publishers", &self.publisher_count())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

fn flatten(map: &Declarations) -> Vec<ChannelDeclaration> {
    map.values().flat_map(|by_type| by_type.values().cloned()).collect()
}

fn remove_entry<V>(
    map: &mut BTreeMap<String, BTreeMap<MessageType, V>>,
    name: &str,
    message_type: MessageType,
) -> Option<V> {
    let by_type = map.get_mut(name)?;
    let removed = by_type.remove(&message_type);
    if by_type.is_empty() {
        map.remove(name);
    }
    removed
}
