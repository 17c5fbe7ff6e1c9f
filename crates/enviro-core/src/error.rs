//! Error types for enviro-core.
//!
//! Validation failures are not represented here; they are carried as a list
//! of [`crate::ValidationError`] values so callers can surface every violated
//! field in one response.

use thiserror::Error;

/// Errors that can occur when operating the device link.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Operation requires an active link.
    #[error("device link is not connected")]
    NotConnected,

    /// The credential triple is missing or still holds placeholder values.
    #[error("device link configuration is incomplete: {0}")]
    ConfigIncomplete(String),

    /// Transport-level failure. Drives reconnect transitions; never
    /// propagated to callers of unrelated operations.
    #[error("device link transport error: {0}")]
    Link(String),
}

impl Error {
    /// Create a transport error from any displayable cause.
    pub fn link(cause: impl std::fmt::Display) -> Self {
        Self::Link(cause.to_string())
    }
}

/// Result type alias using enviro-core's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
