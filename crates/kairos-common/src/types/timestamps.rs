//! Timestamp type for Kairos.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in time, in milliseconds since the Unix epoch.
///
/// Timestamps are signed so that pre-epoch data can be represented.
///
/// # Example
///
/// ```rust
/// use kairos_common::types::Timestamp;
///
/// let ts = Timestamp::new(1_700_000_000_000);
/// assert_eq!(ts.as_millis(), 1_700_000_000_000);
/// assert!(ts.is_valid());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Invalid timestamp sentinel.
    pub const INVALID: Self = Self(i64::MIN);

    /// The smallest valid timestamp.
    pub const MIN: Self = Self(i64::MIN + 1);

    /// The largest valid timestamp.
    pub const MAX: Self = Self(i64::MAX);

    /// Creates a new timestamp from milliseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub const fn new(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the raw millisecond value.
    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Checks if this is a valid timestamp.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Timestamp(INVALID)")
        } else {
            write!(f, "Timestamp({})", self.0)
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Timestamp {
    #[inline]
    fn from(millis: i64) -> Self {
        Self::new(millis)
    }
}

impl From<Timestamp> for i64 {
    #[inline]
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}
