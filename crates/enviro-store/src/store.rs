//! The time-series store.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, info};

use enviro_types::{Reading, ReadingPatch, SensorField, TimeRange, now_ms};

use crate::window::{FieldSeries, FullSeries, WindowResult};

/// Default history capacity: 24 hours at six samples per minute.
pub const DEFAULT_MAX_HISTORY: usize = 8640;

/// Owns the current reading and the bounded history buffer.
///
/// The buffer is strict FIFO: insertion at capacity evicts the oldest entry,
/// entries are never mutated after insertion, and every read operation
/// returns copies — no caller holds a reference into the buffer.
///
/// The store does not validate; callers run the reading validator first.
#[derive(Debug, Clone)]
pub struct SensorStore {
    current: Reading,
    history: VecDeque<Reading>,
    max_history_size: usize,
}

impl SensorStore {
    /// Create an empty store with the given history capacity.
    #[must_use]
    pub fn new(max_history_size: usize) -> Self {
        Self {
            current: Reading::initial(),
            history: VecDeque::new(),
            max_history_size,
        }
    }

    /// History capacity.
    #[must_use]
    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    /// Number of readings currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// True if no history has accumulated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Copy of the current reading. Never fails.
    #[must_use]
    pub fn snapshot(&self) -> Reading {
        self.current
    }

    /// Merge a partial reading onto the current one, stamp the current time,
    /// append the result to history, and return the new current reading.
    pub fn update(&mut self, patch: &ReadingPatch) -> Reading {
        self.update_at(patch, now_ms())
    }

    /// [`update`](Self::update) against an explicit timestamp.
    ///
    /// Timestamps are accepted as-is, even if they regress behind the head
    /// of history; the window filter is a per-entry predicate and tolerates
    /// an unsorted slice.
    pub fn update_at(&mut self, patch: &ReadingPatch, timestamp: i64) -> Reading {
        self.current = self.current.merged(patch, timestamp);
        self.push_history(self.current);
        self.current
    }

    fn push_history(&mut self, reading: Reading) {
        if self.max_history_size == 0 {
            return;
        }
        if self.history.len() >= self.max_history_size {
            self.history.pop_front();
        }
        self.history.push_back(reading);
    }

    /// The last `limit` readings, oldest first. `limit` is clamped to the
    /// buffer length.
    #[must_use]
    pub fn recent_history(&self, limit: usize) -> Vec<Reading> {
        let limit = limit.min(self.history.len());
        let start = self.history.len() - limit;
        self.history.iter().skip(start).copied().collect()
    }

    /// History within the window ending now, optionally narrowed to one
    /// field. Ordering matches insertion order, oldest first.
    #[must_use]
    pub fn query(&self, range: TimeRange, field: Option<SensorField>) -> WindowResult {
        self.query_at(range, field, now_ms())
    }

    /// [`query`](Self::query) against an explicit reference time. The window
    /// is `[now - range, now]`, inclusive on both ends.
    #[must_use]
    pub fn query_at(
        &self,
        range: TimeRange,
        field: Option<SensorField>,
        now: i64,
    ) -> WindowResult {
        let start = now - range.duration_ms();
        let filtered = self
            .history
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp <= now);

        match field {
            Some(field) => {
                let mut series = FieldSeries::empty(field, range);
                for reading in filtered {
                    series.timestamps.push(reading.timestamp);
                    series.values.push(reading.get(field));
                }
                series.count = series.values.len();
                WindowResult::Field(series)
            }
            None => {
                let mut series = FullSeries::empty(range);
                for reading in filtered {
                    series.timestamps.push(reading.timestamp);
                    series.temperature.push(reading.temperature);
                    series.humidity.push(reading.humidity);
                    series.light.push(reading.light);
                    series.pwm.push(reading.pwm);
                }
                series.count = series.timestamps.len();
                WindowResult::Full(series)
            }
        }
    }

    /// Empty the history buffer; the current reading is untouched.
    pub fn clear(&mut self) {
        info!("history cleared ({} readings dropped)", self.history.len());
        self.history.clear();
    }

    /// Restore the current reading to the startup default and clear history.
    pub fn reset(&mut self) {
        debug!("store reset to initial reading");
        self.current = Reading::initial();
        self.history.clear();
    }

    /// Counters for the health endpoint.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            count: self.history.len(),
            max_history_size: self.max_history_size,
            last_update: self.current.timestamp,
            oldest_timestamp: self.history.front().map(|r| r.timestamp),
        }
    }
}

impl Default for SensorStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

/// Store counters exposed over the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StoreStats {
    /// Readings currently held.
    pub count: usize,
    /// History capacity.
    pub max_history_size: usize,
    /// Timestamp of the current reading.
    pub last_update: i64,
    /// Timestamp of the oldest held reading, if any.
    pub oldest_timestamp: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(field: SensorField, value: f64) -> ReadingPatch {
        let mut patch = ReadingPatch::default();
        patch.set(field, value);
        patch
    }

    #[test]
    fn test_snapshot_starts_at_initial_reading() {
        let store = SensorStore::new(10);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.temperature, 25.6);
        assert_eq!(snapshot.humidity, 65.2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_merges_and_stamps() {
        let mut store = SensorStore::new(10);
        let before = store.snapshot();

        let updated = store.update_at(&patch(SensorField::Temperature, 30.0), before.timestamp + 5);
        assert_eq!(updated.temperature, 30.0);
        assert_eq!(updated.humidity, before.humidity);
        assert_eq!(updated.light, before.light);
        assert_eq!(updated.pwm, before.pwm);
        assert_eq!(updated.timestamp, before.timestamp + 5);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_empty_patch_restamps_current_into_history() {
        let mut store = SensorStore::new(10);
        let before = store.snapshot();

        let updated = store.update_at(&ReadingPatch::default(), before.timestamp + 1);
        assert_eq!(updated.temperature, before.temperature);
        assert_eq!(updated.timestamp, before.timestamp + 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_history_is_bounded_fifo() {
        let capacity = 5;
        let extra = 3;
        let mut store = SensorStore::new(capacity);

        for i in 0..(capacity + extra) {
            store.update_at(&patch(SensorField::Pwm, i as f64), i as i64);
        }

        assert_eq!(store.len(), capacity);
        let history = store.recent_history(capacity);
        // Only the last `capacity` readings remain, oldest first.
        for (offset, reading) in history.iter().enumerate() {
            assert_eq!(reading.pwm, (extra + offset) as f64);
        }
    }

    #[test]
    fn test_history_entries_are_not_mutated_by_later_updates() {
        let mut store = SensorStore::new(10);
        store.update_at(&patch(SensorField::Temperature, 20.0), 1);
        store.update_at(&patch(SensorField::Temperature, 21.0), 2);

        let history = store.recent_history(2);
        assert_eq!(history[0].temperature, 20.0);
        assert_eq!(history[1].temperature, 21.0);
    }

    #[test]
    fn test_recent_history_clamps_limit() {
        let mut store = SensorStore::new(10);
        for i in 0..4 {
            store.update_at(&ReadingPatch::default(), i);
        }

        assert_eq!(store.recent_history(2).len(), 2);
        assert_eq!(store.recent_history(100).len(), 4);
        assert!(store.recent_history(0).is_empty());

        // Last two, oldest first.
        let last_two = store.recent_history(2);
        assert_eq!(last_two[0].timestamp, 2);
        assert_eq!(last_two[1].timestamp, 3);
    }

    #[test]
    fn test_window_filters_inclusively() {
        let mut store = SensorStore::new(10);
        let t = 1_700_000_000_000;
        store.update_at(&ReadingPatch::default(), t - 120_000);
        store.update_at(&ReadingPatch::default(), t - 30_000);
        store.update_at(&ReadingPatch::default(), t - 100);

        let result = store.query_at(TimeRange::OneMinute, None, t);
        let WindowResult::Full(series) = result else {
            panic!("expected full series");
        };
        assert_eq!(series.count, 2);
        assert_eq!(series.timestamps, vec![t - 30_000, t - 100]);
    }

    #[test]
    fn test_window_boundary_is_part_of_the_window() {
        let mut store = SensorStore::new(10);
        let t = 1_700_000_000_000;
        store.update_at(&ReadingPatch::default(), t - 60_000);
        store.update_at(&ReadingPatch::default(), t);

        let result = store.query_at(TimeRange::OneMinute, None, t);
        assert_eq!(result.count(), 2);
    }

    #[test]
    fn test_field_query_extracts_one_series() {
        let mut store = SensorStore::new(10);
        let t = 1_700_000_000_000;
        store.update_at(&patch(SensorField::Light, 100.0), t - 2);
        store.update_at(&patch(SensorField::Light, 200.0), t - 1);

        let result = store.query_at(TimeRange::OneMinute, Some(SensorField::Light), t);
        let WindowResult::Field(series) = result else {
            panic!("expected field series");
        };
        assert_eq!(series.field, SensorField::Light);
        assert_eq!(series.unit, "lux");
        assert_eq!(series.values, vec![100.0, 200.0]);
        assert_eq!(series.count, 2);
    }

    #[test]
    fn test_query_preserves_insertion_order_despite_regression() {
        let mut store = SensorStore::new(10);
        let t = 1_700_000_000_000;
        // A later-arriving reading carrying an earlier timestamp is accepted
        // as-is; the slice keeps insertion order.
        store.update_at(&ReadingPatch::default(), t - 10);
        store.update_at(&ReadingPatch::default(), t - 50);

        let result = store.query_at(TimeRange::OneMinute, None, t);
        let WindowResult::Full(series) = result else {
            panic!("expected full series");
        };
        assert_eq!(series.timestamps, vec![t - 10, t - 50]);
    }

    #[test]
    fn test_clear_keeps_current() {
        let mut store = SensorStore::new(10);
        store.update_at(&patch(SensorField::Temperature, 30.0), 1);
        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.snapshot().temperature, 30.0);
    }

    #[test]
    fn test_reset_restores_initial_reading() {
        let mut store = SensorStore::new(10);
        store.update_at(&patch(SensorField::Temperature, 30.0), 1);
        store.reset();

        assert!(store.is_empty());
        assert_eq!(store.snapshot().temperature, 25.6);
        assert_eq!(store.snapshot().pwm, 85.0);
    }

    #[test]
    fn test_stats() {
        let mut store = SensorStore::new(10);
        assert_eq!(store.stats().count, 0);
        assert_eq!(store.stats().oldest_timestamp, None);

        store.update_at(&ReadingPatch::default(), 5);
        store.update_at(&ReadingPatch::default(), 6);
        let stats = store.stats();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.max_history_size, 10);
        assert_eq!(stats.last_update, 6);
        assert_eq!(stats.oldest_timestamp, Some(5));
    }

    #[test]
    fn test_zero_capacity_store_keeps_no_history() {
        let mut store = SensorStore::new(0);
        store.update_at(&ReadingPatch::default(), 1);
        assert!(store.is_empty());
        assert_eq!(store.snapshot().timestamp, 1);
    }
}
