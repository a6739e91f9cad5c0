//! Typed publishers.
//!
//! Each publisher declares itself on a client and filters what it sends:
//! every publisher can skip values equal to the last one sent, and range
//! publishers can additionally remap and smooth their input.

use brew_core::{ChangeGate, RangeMapping, RangeTransform};
use brew_protocol::Value;
use tracing::trace;

use crate::client::BrewClient;
use crate::error::ClientError;

/// A named output channel.
pub trait Publish {
    /// What the application hands in.
    type Input;

    /// Publisher name.
    fn name(&self) -> &str;

    /// Offer a value.
    ///
    /// Returns `Ok(true)` if it was sent, `Ok(false)` if it was discarded
    /// because the client is disconnected or the change gate held it back.
    ///
    /// # Errors
    ///
    /// Returns an error if the client failed to send it.
    fn publish(&mut self, value: Self::Input) -> Result<bool, ClientError>;
}

/// A boolean or string publisher with an optional change gate.
#[derive(Debug)]
pub struct ValuePublisher<T> {
    client: BrewClient,
    name: String,
    default: T,
    gate: ChangeGate<T>,
}

/// Publishes booleans.
pub type BooleanPublisher = ValuePublisher<bool>;

/// Publishes strings.
pub type StringPublisher = ValuePublisher<String>;

impl<T> ValuePublisher<T>
where
    T: Clone + PartialEq + Into<Value>,
{
    /// Declare the publisher `name` on `client`.
    pub fn new(client: &BrewClient, name: impl Into<String>, default: T) -> Self {
        let name = name.into();
        client.add_publisher(&name, default.clone());
        Self {
            client: client.clone(),
            name,
            default,
            gate: ChangeGate::new(),
        }
    }

    /// The announced default value.
    #[must_use]
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Only send values that differ from the last one sent.
    pub fn activate_update_filter(&mut self) {
        self.gate.activate();
    }

    /// Send every value.
    pub fn deactivate_update_filter(&mut self) {
        self.gate.deactivate();
    }

    #[must_use]
    pub fn update_filter_active(&self) -> bool {
        self.gate.is_active()
    }

    /// The last value sent, if any.
    #[must_use]
    pub fn last_sent(&self) -> Option<&T> {
        self.gate.last_sent()
    }
}

impl<T> Publish for ValuePublisher<T>
where
    T: Clone + PartialEq + Into<Value>,
{
    type Input = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn publish(&mut self, value: T) -> Result<bool, ClientError> {
        if !self.client.is_connected() {
            trace!(name = %self.name, "Not connected, discarding");
            return Ok(false);
        }
        if !self.gate.admit(value.clone()) {
            trace!(name = %self.name, "Unchanged, discarding");
            return Ok(false);
        }
        self.client.send(&self.name, value)?;
        Ok(true)
    }
}

/// Publishes range values from arbitrary numeric input.
///
/// Input passes through an optional low-pass filter, is remapped from the
/// configured input range onto `0..=1023` and clamped, then goes through the
/// change gate.
#[derive(Debug)]
pub struct RangePublisher {
    client: BrewClient,
    name: String,
    default: u16,
    transform: RangeTransform,
}

impl RangePublisher {
    /// Declare the range publisher `name` on `client`.
    pub fn new(client: &BrewClient, name: impl Into<String>, default: u16) -> Self {
        let name = name.into();
        let default = brew_protocol::message::clamp_range(i64::from(default));
        client.add_publisher(&name, Value::Range(default));
        Self {
            client: client.clone(),
            name,
            default,
            transform: RangeTransform::new(),
        }
    }

    /// The announced default value.
    #[must_use]
    pub fn default_value(&self) -> u16 {
        self.default
    }

    /// Remap input from `min..=max`. Equal bounds disable remapping.
    pub fn set_input_range(&mut self, min: f64, max: f64) {
        self.transform.set_input_range(min, max);
    }

    #[must_use]
    pub fn input_range(&self) -> RangeMapping {
        self.transform.input_range()
    }

    /// Smooth input with `alpha` in `(0, 1]`; smaller is smoother.
    pub fn enable_low_pass(&mut self, alpha: f64) {
        let filter = self.transform.low_pass_mut();
        filter.set_alpha(alpha);
        filter.activate();
    }

    pub fn disable_low_pass(&mut self) {
        self.transform.low_pass_mut().deactivate();
    }

    /// Only send values that differ from the last one sent.
    pub fn activate_update_filter(&mut self) {
        self.transform.gate_mut().activate();
    }

    /// Send every value.
    pub fn deactivate_update_filter(&mut self) {
        self.transform.gate_mut().deactivate();
    }

    /// The last raw input.
    #[must_use]
    pub fn last_input(&self) -> f64 {
        self.transform.last_input()
    }

    /// The last low-pass output.
    #[must_use]
    pub fn last_filtered(&self) -> f64 {
        self.transform.last_filtered()
    }

    /// The last value sent, if any.
    #[must_use]
    pub fn last_sent(&self) -> Option<u16> {
        self.transform.last_sent()
    }
}

impl Publish for RangePublisher {
    type Input = f64;

    fn name(&self) -> &str {
        &self.name
    }

    fn publish(&mut self, input: f64) -> Result<bool, ClientError> {
        self.transform.record_input(input);
        if !self.client.is_connected() {
            trace!(name = %self.name, "Not connected, discarding");
            return Ok(false);
        }
        let Some(value) = self.transform.apply(input) else {
            trace!(name = %self.name, "Unchanged, discarding");
            return Ok(false);
        };
        self.client.send(&self.name, Value::Range(value))?;
        Ok(true)
    }
}
