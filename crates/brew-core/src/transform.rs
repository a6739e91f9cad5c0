//! Value transforms applied by typed publishers before sending.
//!
//! Range publishers run input through an optional low-pass filter, an
//! optional linear remap into the protocol interval, a clamp, and the
//! change-only gate. Boolean and string publishers only use the gate.
//! Nothing here performs I/O.

use brew_protocol::{RANGE_MAX, RANGE_MIN};

/// Default smoothing factor for the low-pass filter.
pub const DEFAULT_LOW_PASS_ALPHA: f64 = 0.2;

/// Suppresses a send when the value equals the last one sent.
///
/// The first value always passes; there is no "last sent" before it.
#[derive(Debug, Clone, Default)]
pub struct ChangeGate<T> {
    active: bool,
    last_sent: Option<T>,
}

impl<T: PartialEq + Clone> ChangeGate<T> {
    /// Create an inactive gate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: false,
            last_sent: None,
        }
    }

    /// Only let changed values through from now on.
    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Let every value through.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Whether the gate is filtering.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The last value that passed the gate.
    #[must_use]
    pub fn last_sent(&self) -> Option<&T> {
        self.last_sent.as_ref()
    }

    /// Offer a candidate. Returns `true` and records it if it should be sent.
    pub fn admit(&mut self, candidate: T) -> bool {
        if self.active && self.last_sent.as_ref() == Some(&candidate) {
            return false;
        }
        self.last_sent = Some(candidate);
        true
    }
}

/// First-order low-pass filter: `alpha * input + (1 - alpha) * previous`.
///
/// `alpha` is expected in `(0, 1)`. Values at or below 0 freeze the output
/// and values at or above 1 pass input through unchanged.
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    active: bool,
    alpha: f64,
    filtered: f64,
}

impl Default for LowPassFilter {
    fn default() -> Self {
        Self {
            active: false,
            alpha: DEFAULT_LOW_PASS_ALPHA,
            filtered: 0.0,
        }
    }
}

impl LowPassFilter {
    /// Create an inactive filter with the default alpha.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }

    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// The last filtered value.
    #[must_use]
    pub fn filtered(&self) -> f64 {
        self.filtered
    }

    /// Feed a sample. Returns the input unchanged while inactive.
    pub fn apply(&mut self, input: f64) -> f64 {
        if !self.active {
            return input;
        }
        self.filtered = self.alpha * input + (1.0 - self.alpha) * self.filtered;
        self.filtered
    }
}

/// Linear remap of an input interval onto `[RANGE_MIN, RANGE_MAX]`.
///
/// A degenerate interval (`min == max`) leaves values untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RangeMapping {
    pub min: f64,
    pub max: f64,
}

impl RangeMapping {
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether this mapping changes values.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.min != self.max
    }

    #[must_use]
    pub fn remap(&self, value: f64) -> f64 {
        if !self.is_active() {
            return value;
        }
        let span = f64::from(RANGE_MAX - RANGE_MIN);
        (value - self.min) * span / (self.max - self.min) + f64::from(RANGE_MIN)
    }
}

/// Clamp into the protocol interval and truncate toward zero.
#[must_use]
pub fn clamp_to_range(value: f64) -> u16 {
    // NaN casts to 0
    value.clamp(f64::from(RANGE_MIN), f64::from(RANGE_MAX)) as u16
}

/// The full pipeline state of one range publisher.
#[derive(Debug, Clone, Default)]
pub struct RangeTransform {
    last_input: f64,
    low_pass: LowPassFilter,
    mapping: RangeMapping,
    gate: ChangeGate<u16>,
}

impl RangeTransform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest raw input without running the pipeline.
    pub fn record_input(&mut self, input: f64) {
        self.last_input = input;
    }

    /// Run filter, remap, clamp and gate on an input.
    ///
    /// Returns the value to send, or `None` if the gate suppressed it.
    pub fn apply(&mut self, input: f64) -> Option<u16> {
        self.last_input = input;
        let filtered = self.low_pass.apply(input);
        let remapped = self.mapping.remap(filtered);
        let candidate = clamp_to_range(remapped);
        self.gate.admit(candidate).then_some(candidate)
    }

    /// Set the expected input interval. Equal bounds disable remapping.
    pub fn set_input_range(&mut self, min: f64, max: f64) {
        self.mapping = RangeMapping::new(min, max);
    }

    #[must_use]
    pub fn input_range(&self) -> RangeMapping {
        self.mapping
    }

    #[must_use]
    pub fn last_input(&self) -> f64 {
        self.last_input
    }

    #[must_use]
    pub fn last_filtered(&self) -> f64 {
        self.low_pass.filtered()
    }

    #[must_use]
    pub fn last_sent(&self) -> Option<u16> {
        self.gate.last_sent().copied()
    }

    pub fn low_pass_mut(&mut self) -> &mut LowPassFilter {
        &mut self.low_pass
    }

    #[must_use]
    pub fn low_pass(&self) -> &LowPassFilter {
        &self.low_pass
    }

    pub fn gate_mut(&mut self) -> &mut ChangeGate<u16> {
        &mut self.gate
    }

    #[must_use]
    pub fn gate(&self) -> &ChangeGate<u16> {
        &self.gate
    }
}
