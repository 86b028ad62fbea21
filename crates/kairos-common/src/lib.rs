//! # kairos-common
//!
//! Common types and constants for the Kairos time-series database.
//!
//! This crate provides the foundational types shared across the Kairos
//! storage components:
//!
//! - **Types**: Core identifiers (`DeviceId`, `MeasurementId`) and the
//!   `Timestamp` newtype
//! - **Constants**: File-format magic numbers and system-wide defaults
//!
//! ## Example
//!
//! ```rust
//! use kairos_common::types::{DeviceId, MeasurementId, Timestamp};
//!
//! let device = DeviceId::new("root.turbine.unit1");
//! let measurement = MeasurementId::new("rotation_speed");
//! let ts = Timestamp::new(1_700_000_000_000);
//! assert_eq!(device.as_str(), "root.turbine.unit1");
//! assert!(ts.is_valid());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::{DeviceId, MeasurementId, Timestamp};
