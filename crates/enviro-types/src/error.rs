//! Error types for parsing query parameters.

use thiserror::Error;

/// Errors that can occur when parsing field or range tokens.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The field name did not match any sensor field.
    #[error("unknown sensor field '{0}' (valid fields: temperature, humidity, light, pwm)")]
    UnknownField(String),

    /// The range token did not match any time range.
    #[error("unknown time range '{0}' (valid ranges: 1m, 10m, 1h, 24h)")]
    UnknownRange(String),
}
