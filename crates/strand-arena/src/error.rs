//! Arena-specific error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur during arena operations.
///
/// Every failing operation leaves the arena in a valid state and reports
/// the failure through this type; the arena never retries internally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// No free chunk fits and growth is disabled or blocked by the ceiling.
    CapacityExhausted {
        /// Number of units requested.
        requested: u32,
        /// Capacity of the arena when the request failed, in units.
        capacity: u32,
        /// The configured capacity ceiling, if any.
        ceiling: Option<u32>,
    },
    /// Requested capacity is smaller than the number of occupied units.
    InvalidShrink {
        /// The capacity that was requested.
        requested: u32,
        /// Units currently occupied.
        occupied: u32,
    },
    /// The arena configuration is inconsistent.
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// A handle that does not belong to this arena, or was already released.
    ///
    /// This is a programmer error. Debug builds panic at the point of
    /// misuse; release builds return this value without touching state.
    HandleMisuse {
        /// Human-readable description of the misuse.
        reason: String,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExhausted {
                requested,
                capacity,
                ceiling,
            } => {
                write!(
                    f,
                    "arena capacity exhausted: requested {requested} units, capacity {capacity} units"
                )?;
                if let Some(ceiling) = ceiling {
                    write!(f, ", ceiling {ceiling} units")?;
                }
                Ok(())
            }
            Self::InvalidShrink {
                requested,
                occupied,
            } => {
                write!(
                    f,
                    "cannot shrink arena to {requested} units: {occupied} units occupied"
                )
            }
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
            Self::HandleMisuse { reason } => write!(f, "chunk handle misuse: {reason}"),
        }
    }
}

impl Error for ArenaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_capacity_exhausted_without_ceiling() {
        let err = ArenaError::CapacityExhausted {
            requested: 8,
            capacity: 4,
            ceiling: None,
        };
        assert_eq!(
            err.to_string(),
            "arena capacity exhausted: requested 8 units, capacity 4 units"
        );
    }

    #[test]
    fn display_capacity_exhausted_with_ceiling() {
        let err = ArenaError::CapacityExhausted {
            requested: 8,
            capacity: 4,
            ceiling: Some(6),
        };
        assert!(err.to_string().ends_with("ceiling 6 units"));
    }

    #[test]
    fn display_invalid_shrink() {
        let err = ArenaError::InvalidShrink {
            requested: 2,
            occupied: 5,
        };
        assert_eq!(
            err.to_string(),
            "cannot shrink arena to 2 units: 5 units occupied"
        );
    }
}
