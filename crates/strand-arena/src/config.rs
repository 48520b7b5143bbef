//! Arena configuration parameters.

use crate::error::ArenaError;

/// How an arena reacts when no free run can satisfy an allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Growth {
    /// Fail with [`ArenaError::CapacityExhausted`].
    Disabled,
    /// Grow capacity by `requested + increment` units and retry once.
    Increment(u32),
}

impl Growth {
    /// Whether the arena may grow on demand.
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Increment(_))
    }
}

/// Configuration for a [`ChunkArena`](crate::ChunkArena).
///
/// Validated at construction; all values are immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Capacity at construction, in units.
    pub initial_capacity: u32,

    /// Growth policy when an allocation does not fit.
    ///
    /// Default: `Growth::Increment(DEFAULT_GROWTH_INCREMENT)`.
    pub growth: Growth,

    /// Hard upper bound on capacity, in units. `None` means unbounded.
    ///
    /// Must be at least `initial_capacity` when set.
    pub capacity_ceiling: Option<u32>,

    /// Whether an allocation that fits in aggregate free space, but in no
    /// single free run, defragments the arena before falling back to growth.
    ///
    /// Default: `true`. Disabling it trades capacity for never moving data
    /// outside explicit [`compact`](crate::ChunkArena::compact) and
    /// capacity-shrink calls.
    pub compact_on_pressure: bool,
}

impl ArenaConfig {
    /// Default growth increment in units.
    pub const DEFAULT_GROWTH_INCREMENT: u32 = 1024;

    /// Create a growable config with the given initial capacity.
    pub fn new(initial_capacity: u32) -> Self {
        Self {
            initial_capacity,
            growth: Growth::Increment(Self::DEFAULT_GROWTH_INCREMENT),
            capacity_ceiling: None,
            compact_on_pressure: true,
        }
    }

    /// Create a config whose capacity only changes through explicit
    /// `resize_capacity` calls.
    pub fn fixed(capacity: u32) -> Self {
        Self {
            growth: Growth::Disabled,
            ..Self::new(capacity)
        }
    }

    /// Replace the growth policy.
    #[must_use]
    pub fn with_growth(mut self, growth: Growth) -> Self {
        self.growth = growth;
        self
    }

    /// Set a capacity ceiling.
    #[must_use]
    pub fn with_ceiling(mut self, ceiling: u32) -> Self {
        self.capacity_ceiling = Some(ceiling);
        self
    }

    /// Enable or disable defragmentation under allocation pressure.
    #[must_use]
    pub fn with_compact_on_pressure(mut self, enabled: bool) -> Self {
        self.compact_on_pressure = enabled;
        self
    }

    /// Check the config for internal consistency.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if let Some(ceiling) = self.capacity_ceiling {
            if self.initial_capacity > ceiling {
                return Err(ArenaError::InvalidConfig {
                    reason: format!(
                        "initial_capacity ({}) exceeds capacity_ceiling ({ceiling})",
                        self.initial_capacity,
                    ),
                });
            }
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_growable_and_unbounded() {
        let config = ArenaConfig::new(64);
        assert_eq!(config.initial_capacity, 64);
        assert!(config.growth.is_enabled());
        assert_eq!(config.capacity_ceiling, None);
        assert!(config.compact_on_pressure);
    }

    #[test]
    fn fixed_disables_growth() {
        let config = ArenaConfig::fixed(16);
        assert_eq!(config.growth, Growth::Disabled);
        assert_eq!(config.initial_capacity, 16);
    }

    #[test]
    fn ceiling_below_initial_capacity_is_rejected() {
        let config = ArenaConfig::new(100).with_ceiling(50);
        assert!(matches!(
            config.validate(),
            Err(ArenaError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn ceiling_equal_to_initial_capacity_is_accepted() {
        assert!(ArenaConfig::new(50).with_ceiling(50).validate().is_ok());
    }

    #[test]
    fn zero_increment_is_still_growth() {
        let config = ArenaConfig::new(0).with_growth(Growth::Increment(0));
        assert!(config.growth.is_enabled());
        assert!(config.validate().is_ok());
    }
}
