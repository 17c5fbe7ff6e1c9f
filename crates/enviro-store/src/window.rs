//! Windowed query results and stride downsampling.
//!
//! Downsampling is stride sampling, not averaging: when a series exceeds the
//! display budget, every `step`-th point is kept, so the sampled points carry
//! exact historical values rather than smoothed ones.

use serde::Serialize;

use enviro_types::{SensorField, TimeRange};

/// Default display budget for chart series.
pub const DISPLAY_BUDGET: usize = 100;

/// The result of a windowed history query.
///
/// Serialized untagged: a field-narrowed query produces a single value
/// array, a full query produces all four.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WindowResult {
    /// One field's series.
    Field(FieldSeries),
    /// All four fields' series.
    Full(FullSeries),
}

impl WindowResult {
    /// Number of points in the result.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            WindowResult::Field(series) => series.count,
            WindowResult::Full(series) => series.count,
        }
    }
}

/// A single field's values over a time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSeries {
    /// The selected field.
    pub field: SensorField,
    /// Display unit for the field.
    pub unit: &'static str,
    /// The queried range.
    pub range: TimeRange,
    /// Timestamps in insertion order, oldest first.
    pub timestamps: Vec<i64>,
    /// Values aligned with `timestamps`.
    pub values: Vec<f64>,
    /// Number of points.
    pub count: usize,
}

impl FieldSeries {
    /// An empty series for the given field and range.
    #[must_use]
    pub fn empty(field: SensorField, range: TimeRange) -> Self {
        Self {
            field,
            unit: field.unit(),
            range,
            timestamps: Vec::new(),
            values: Vec::new(),
            count: 0,
        }
    }
}

/// All four fields' values over a time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullSeries {
    /// The queried range.
    pub range: TimeRange,
    /// Timestamps in insertion order, oldest first.
    pub timestamps: Vec<i64>,
    /// Temperature values aligned with `timestamps`.
    pub temperature: Vec<f64>,
    /// Humidity values aligned with `timestamps`.
    pub humidity: Vec<f64>,
    /// Light values aligned with `timestamps`.
    pub light: Vec<f64>,
    /// PWM values aligned with `timestamps`.
    pub pwm: Vec<f64>,
    /// Number of points.
    pub count: usize,
}

impl FullSeries {
    /// An empty series for the given range.
    #[must_use]
    pub fn empty(range: TimeRange) -> Self {
        Self {
            range,
            timestamps: Vec::new(),
            temperature: Vec::new(),
            humidity: Vec::new(),
            light: Vec::new(),
            pwm: Vec::new(),
            count: 0,
        }
    }
}

/// Reduce a window result to at most roughly `budget` points.
///
/// Results at or under the budget pass through unchanged. Larger results are
/// stride-sampled with `step = count.div_ceil(budget)`, keeping indices
/// `0, step, 2*step, …` of every array. Deterministic: identical input and
/// budget always yield identical output.
///
/// Note that the operation is not idempotent on its own output in general —
/// re-striding a sampled series changes the effective interval between kept
/// points — so it must be applied to the raw query result exactly once.
#[must_use]
pub fn downsample(result: WindowResult, budget: usize) -> WindowResult {
    let count = result.count();
    if budget == 0 || count <= budget {
        return result;
    }
    let step = count.div_ceil(budget);

    match result {
        WindowResult::Field(series) => {
            let timestamps = stride(&series.timestamps, step);
            let values = stride(&series.values, step);
            let count = values.len();
            WindowResult::Field(FieldSeries {
                timestamps,
                values,
                count,
                ..series
            })
        }
        WindowResult::Full(series) => {
            let timestamps = stride(&series.timestamps, step);
            let count = timestamps.len();
            WindowResult::Full(FullSeries {
                temperature: stride(&series.temperature, step),
                humidity: stride(&series.humidity, step),
                light: stride(&series.light, step),
                pwm: stride(&series.pwm, step),
                timestamps,
                count,
                range: series.range,
            })
        }
    }
}

fn stride<T: Copy>(values: &[T], step: usize) -> Vec<T> {
    values.iter().copied().step_by(step).collect()
}
