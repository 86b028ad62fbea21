//! Core types for Kairos.
//!
//! This module provides type-safe wrappers around the raw strings and
//! integers used throughout the storage layer.

mod ids;
mod timestamps;

pub use ids::{DeviceId, MeasurementId};
pub use timestamps::Timestamp;
