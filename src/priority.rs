//! # Priority Space Mapping
//!
//! Applications name priorities in the ITRON numbering `[1, MAX_PRIORITY]`;
//! the ready-queue store indexes its queues `[0, NUM_PRIORITIES)`. The
//! mapping is order-preserving: lower numbers are more urgent on both sides.
//!
//! ```text
//!   external   1    2    3   ...  255
//!               │    │    │         │
//!   internal   0    1    2   ...  254
//! ```
//!
//! Any value crossing the boundary goes through [`to_internal`] /
//! [`to_external`]. Out-of-range values are rejected, never clamped.

use crate::config::{MAX_PRIORITY, MIN_PRIORITY, NUM_PRIORITIES};
use crate::error::{Result, SchedError};

/// Internal priority level. Only constructible in range, so every
/// `Priority` indexes a real ready queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

impl Priority {
    /// Most urgent internal level.
    pub const HIGHEST: Priority = Priority(0);

    /// Least urgent internal level.
    pub const LOWEST: Priority = Priority((NUM_PRIORITIES - 1) as u8);

    /// Checked constructor from an internal queue index.
    pub const fn new(index: usize) -> Result<Self> {
        if index < NUM_PRIORITIES {
            Ok(Priority(index as u8))
        } else {
            Err(SchedError::InvalidPriority)
        }
    }

    /// Queue index of this level.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// `true` if `self` would be dispatched before `other`.
    #[inline]
    pub const fn is_more_urgent_than(self, other: Priority) -> bool {
        self.0 < other.0
    }
}

/// Map an application-facing priority onto the internal numbering.
pub const fn to_internal(external: i32) -> Result<Priority> {
    if external < MIN_PRIORITY || external > MAX_PRIORITY {
        return Err(SchedError::InvalidPriority);
    }
    Priority::new((external - MIN_PRIORITY) as usize)
}

/// Map an internal priority back to the application-facing numbering.
#[inline]
pub const fn to_external(internal: Priority) -> i32 {
    internal.0 as i32 + MIN_PRIORITY
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_full_range() {
        for p in MIN_PRIORITY..=MAX_PRIORITY {
            let internal = to_internal(p).unwrap();
            assert_eq!(to_external(internal), p);
        }
    }

    #[test]
    fn test_bounds() {
        assert_eq!(to_internal(1), Ok(Priority::HIGHEST));
        assert_eq!(to_internal(255), Ok(Priority::LOWEST));
        assert_eq!(to_internal(0), Err(SchedError::InvalidPriority));
        assert_eq!(to_internal(256), Err(SchedError::InvalidPriority));
        assert_eq!(to_internal(-1), Err(SchedError::InvalidPriority));
        assert_eq!(to_internal(i32::MIN), Err(SchedError::InvalidPriority));
        assert_eq!(to_internal(i32::MAX), Err(SchedError::InvalidPriority));
    }

    #[test]
    fn test_internal_constructor_is_checked() {
        assert!(Priority::new(0).is_ok());
        assert!(Priority::new(NUM_PRIORITIES - 1).is_ok());
        assert_eq!(Priority::new(NUM_PRIORITIES), Err(SchedError::InvalidPriority));
    }

    #[test]
    fn test_order_preserving() {
        let a = to_internal(5).unwrap();
        let b = to_internal(9).unwrap();
        assert!(a.is_more_urgent_than(b));
        assert!(!b.is_more_urgent_than(a));
        assert!(!a.is_more_urgent_than(a));
    }
}
