//! Relative time ranges for history queries.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// A relative time window, resolved against wall-clock "now" at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeRange {
    /// The last minute.
    #[default]
    #[serde(rename = "1m")]
    OneMinute,
    /// The last ten minutes.
    #[serde(rename = "10m")]
    TenMinutes,
    /// The last hour.
    #[serde(rename = "1h")]
    OneHour,
    /// The last twenty-four hours.
    #[serde(rename = "24h")]
    Day,
}

impl TimeRange {
    /// All ranges, shortest first.
    pub const ALL: [TimeRange; 4] = [
        TimeRange::OneMinute,
        TimeRange::TenMinutes,
        TimeRange::OneHour,
        TimeRange::Day,
    ];

    /// Canonical token, as used in URLs and JSON.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::OneMinute => "1m",
            TimeRange::TenMinutes => "10m",
            TimeRange::OneHour => "1h",
            TimeRange::Day => "24h",
        }
    }

    /// Window length in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        match self {
            TimeRange::OneMinute => 60_000,
            TimeRange::TenMinutes => 600_000,
            TimeRange::OneHour => 3_600_000,
            TimeRange::Day => 86_400_000,
        }
    }

    /// Parse a token, falling back to the one-minute window for anything
    /// unrecognized. REST handlers should use [`FromStr`] instead so the
    /// caller gets an error listing the valid tokens.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(TimeRange::OneMinute),
            "10m" => Ok(TimeRange::TenMinutes),
            "1h" => Ok(TimeRange::OneHour),
            "24h" => Ok(TimeRange::Day),
            other => Err(ParseError::UnknownRange(other.to_string())),
        }
    }
}
