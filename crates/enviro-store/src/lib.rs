//! Bounded in-memory time-series store for the enviro sensor hub.
//!
//! This crate owns the current reading and a bounded, time-ordered history
//! buffer, and provides the windowed query and downsampling engine over it.
//! Nothing is persisted: the hub is entirely in-memory and history is lost
//! on restart by design.
//!
//! Operations never fail for well-formed input — validation happens before
//! the store is touched, and queries over an empty buffer return empty
//! series.
//!
//! # Example
//!
//! ```
//! use enviro_store::SensorStore;
//! use enviro_types::{ReadingPatch, SensorField, TimeRange};
//!
//! let mut store = SensorStore::new(100);
//! store.update(&ReadingPatch {
//!     temperature: Some(21.0),
//!     ..Default::default()
//! });
//!
//! let snapshot = store.snapshot();
//! assert_eq!(snapshot.temperature, 21.0);
//!
//! let window = store.query(TimeRange::OneMinute, Some(SensorField::Temperature));
//! assert_eq!(window.count(), 1);
//! ```

mod store;
mod window;

pub use store::{DEFAULT_MAX_HISTORY, SensorStore, StoreStats};
pub use window::{DISPLAY_BUDGET, FieldSeries, FullSeries, WindowResult, downsample};
