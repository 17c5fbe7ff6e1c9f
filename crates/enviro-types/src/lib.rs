//! Shared data types for the enviro sensor hub.
//!
//! This crate provides the types shared by the store, the core logic, and
//! the HTTP service:
//!
//! - [`Reading`] — one complete set of sensor values plus a timestamp
//! - [`ReadingPatch`] — a partial reading used for merge-style updates
//! - [`SensorField`] — the four measured quantities and their ranges
//! - [`TimeRange`] — relative windows for history queries
//!
//! # Example
//!
//! ```
//! use enviro_types::{Reading, ReadingPatch, SensorField};
//!
//! let current = Reading::initial();
//! let patch = ReadingPatch {
//!     temperature: Some(21.0),
//!     ..Default::default()
//! };
//! let next = current.merged(&patch, current.timestamp + 1);
//! assert_eq!(next.temperature, 21.0);
//! assert_eq!(next.humidity, current.humidity);
//! ```

pub mod error;
pub mod field;
pub mod range;
pub mod reading;

pub use error::ParseError;
pub use field::{FieldRange, SensorField};
pub use range::TimeRange;
pub use reading::{Reading, ReadingPatch, now_ms};
