//! Identifier types for devices and measurements.
//!
//! These types provide type-safe wrappers around the path-like names used
//! in the Kairos data model, preventing accidental mixing of device and
//! measurement names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Device identifier - the grouping key under which measurements live.
///
/// A device names a physical or logical data source (for example
/// `root.turbine.unit1`). Measurement records are always reported grouped
/// by their owning device.
///
/// # Example
///
/// ```rust
/// use kairos_common::types::DeviceId;
///
/// let device = DeviceId::new("root.turbine.unit1");
/// assert_eq!(device.as_str(), "root.turbine.unit1");
/// assert!(!device.is_anonymous());
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a new `DeviceId` from a name.
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the sentinel device used before any device boundary has
    /// been observed (for example when an index tree has no device level).
    #[inline]
    #[must_use]
    pub fn anonymous() -> Self {
        Self(String::new())
    }

    /// Returns the device name as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the identifier and returns the underlying name.
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Returns true if this is the anonymous sentinel device.
    #[inline]
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_anonymous() {
            write!(f, "DeviceId(<anonymous>)")
        } else {
            write!(f, "DeviceId({})", self.0)
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    #[inline]
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for DeviceId {
    #[inline]
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Measurement identifier - names one series within a device.
///
/// # Example
///
/// ```rust
/// use kairos_common::types::MeasurementId;
///
/// let m = MeasurementId::new("rotation_speed");
/// assert_eq!(m.as_str(), "rotation_speed");
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct MeasurementId(String);

impl MeasurementId {
    /// Creates a new `MeasurementId` from a name.
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the measurement name as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the identifier and returns the underlying name.
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for MeasurementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MeasurementId({})", self.0)
    }
}

impl fmt::Display for MeasurementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MeasurementId {
    #[inline]
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for MeasurementId {
    #[inline]
    fn from(name: String) -> Self {
        Self(name)
    }
}
