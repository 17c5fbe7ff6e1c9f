//! Range checks for incoming partial readings.
//!
//! Validation is a pure function over a [`ReadingPatch`]: every present
//! field is checked against its documented range, absent fields are skipped
//! (merge semantics apply after validation), and all violations are reported
//! together rather than stopping at the first.
//!
//! # Example
//!
//! ```
//! use enviro_core::validate;
//! use enviro_types::ReadingPatch;
//!
//! let patch = ReadingPatch {
//!     humidity: Some(150.0),
//!     pwm: Some(50.0),
//!     ..Default::default()
//! };
//! let errors = validate(&patch);
//! assert_eq!(errors.len(), 1);
//! ```

use thiserror::Error;

use enviro_types::{ReadingPatch, SensorField};

/// A single violated field in a candidate reading.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// The value is NaN or infinite.
    #[error("{field} value is not a finite number")]
    NotFinite {
        /// The offending field.
        field: SensorField,
    },

    /// The value lies outside the field's documented range.
    #[error("{field} value {value} is out of range ({min} to {max} {unit})")]
    OutOfRange {
        /// The offending field.
        field: SensorField,
        /// The rejected value.
        value: f64,
        /// Lower bound, inclusive.
        min: f64,
        /// Upper bound, inclusive.
        max: f64,
        /// Display unit.
        unit: &'static str,
    },
}

impl ValidationError {
    /// The field this error is about.
    #[must_use]
    pub fn field(&self) -> SensorField {
        match self {
            ValidationError::NotFinite { field } | ValidationError::OutOfRange { field, .. } => {
                *field
            }
        }
    }
}

/// Check a candidate partial reading against the per-field ranges.
///
/// Returns an empty list iff every present field is finite and within range.
/// No side effects; deterministic.
#[must_use]
pub fn validate(patch: &ReadingPatch) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (field, value) in patch.fields() {
        if !value.is_finite() {
            errors.push(ValidationError::NotFinite { field });
            continue;
        }

        let range = field.range();
        if !range.contains(value) {
            errors.push(ValidationError::OutOfRange {
                field,
                value,
                min: range.min,
                max: range.max,
                unit: range.unit,
            });
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_patch() {
        let patch = ReadingPatch {
            temperature: Some(22.5),
            humidity: Some(45.0),
            light: Some(980.0),
            pwm: Some(50.0),
        };
        assert!(validate(&patch).is_empty());
    }

    #[test]
    fn test_pwm_in_range_passes() {
        let patch = ReadingPatch {
            pwm: Some(50.0),
            ..Default::default()
        };
        assert!(validate(&patch).is_empty());
    }

    #[test]
    fn test_humidity_out_of_range() {
        let patch = ReadingPatch {
            humidity: Some(150.0),
            ..Default::default()
        };
        let errors = validate(&patch);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            ValidationError::OutOfRange {
                field: SensorField::Humidity,
                ..
            }
        ));
        assert!(errors[0].to_string().contains("0 to 100"));
    }

    #[test]
    fn test_absent_fields_not_checked() {
        let patch = ReadingPatch::default();
        assert!(validate(&patch).is_empty());
    }

    #[test]
    fn test_all_violations_reported_together() {
        let patch = ReadingPatch {
            temperature: Some(-80.0),
            humidity: Some(150.0),
            light: Some(-1.0),
            pwm: Some(20.0),
        };
        let errors = validate(&patch);
        assert_eq!(errors.len(), 3);
        let fields: Vec<_> = errors.iter().map(ValidationError::field).collect();
        assert_eq!(
            fields,
            vec![
                SensorField::Temperature,
                SensorField::Humidity,
                SensorField::Light
            ]
        );
    }

    #[test]
    fn test_nan_and_infinity_rejected() {
        let patch = ReadingPatch {
            temperature: Some(f64::NAN),
            light: Some(f64::INFINITY),
            ..Default::default()
        };
        let errors = validate(&patch);
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ValidationError::NotFinite { .. }));
        assert!(matches!(errors[1], ValidationError::NotFinite { .. }));
    }

    #[test]
    fn test_range_bounds_inclusive() {
        let patch = ReadingPatch {
            temperature: Some(-50.0),
            humidity: Some(100.0),
            light: Some(100_000.0),
            pwm: Some(0.0),
        };
        assert!(validate(&patch).is_empty());
    }
}
