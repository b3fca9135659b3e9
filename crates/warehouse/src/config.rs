//! Capacity configuration

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Soft capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 10;

/// Hard ceiling used when none is configured.
pub const DEFAULT_MAX_CAPACITY: usize = 100;

/// Capacity and overflow policy of a [`BoundedBuffer`](crate::BoundedBuffer).
///
/// A `capacity` or `max_capacity` of zero disables the full check entirely:
/// the buffer never blocks a put and grows without bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// Soft limit; may grow when `auto_grow` is set.
    pub capacity: usize,

    /// Hard ceiling that growth never crosses.
    pub max_capacity: usize,

    /// Amount added per growth step. Zero means "the initial capacity".
    pub growth_increment: usize,

    /// Whether a full buffer may raise its soft limit.
    pub auto_grow: bool,

    /// Drop instead of block when a put hits a full buffer.
    pub waiting_disabled_on_full: bool,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_capacity: DEFAULT_MAX_CAPACITY,
            growth_increment: 0,
            auto_grow: false,
            waiting_disabled_on_full: false,
        }
    }
}

impl CapacityConfig {
    /// Creates a fixed-size configuration with the given soft capacity.
    ///
    /// The hard ceiling is the larger of `capacity` and [`DEFAULT_MAX_CAPACITY`].
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            max_capacity: capacity.max(DEFAULT_MAX_CAPACITY),
            ..Self::default()
        }
    }

    /// Creates a configuration with no full check at all.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            capacity: 0,
            max_capacity: 0,
            ..Self::default()
        }
    }

    /// Sets the hard ceiling.
    #[must_use]
    pub const fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Sets the growth step.
    #[must_use]
    pub const fn with_growth_increment(mut self, growth_increment: usize) -> Self {
        self.growth_increment = growth_increment;
        self
    }

    /// Enables or disables capacity auto-growth.
    #[must_use]
    pub const fn with_auto_grow(mut self, auto_grow: bool) -> Self {
        self.auto_grow = auto_grow;
        self
    }

    /// Enables or disables drop-on-full.
    #[must_use]
    pub const fn with_waiting_disabled_on_full(mut self, disabled: bool) -> Self {
        self.waiting_disabled_on_full = disabled;
        self
    }

    /// Returns true if the full check is disabled.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.capacity == 0 || self.max_capacity == 0
    }

    /// The growth step actually applied.
    #[must_use]
    pub const fn effective_growth_increment(&self) -> usize {
        if self.growth_increment == 0 {
            self.capacity
        } else {
            self.growth_increment
        }
    }

    /// Checks that the configuration describes a usable buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the soft capacity exceeds the hard
    /// ceiling of a bounded buffer.
    pub fn validate(&self) -> Result<()> {
        if !self.is_unbounded() && self.capacity > self.max_capacity {
            return Err(Error::InvalidConfig(format!(
                "capacity {} exceeds max_capacity {}",
                self.capacity, self.max_capacity
            )));
        }

        Ok(())
    }
}
