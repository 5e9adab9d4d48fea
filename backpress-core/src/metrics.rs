//! Histogram plumbing for consumed back presses.
//!
//! The category → sample mapping is owned by each manager instance. Nothing
//! here is process-global, so several managers (e.g. in tests) never share
//! counts.

use std::collections::BTreeMap;

use compact_str::CompactString;
use enum_map::EnumMap;
use parking_lot::Mutex;
use tracing::info;

use crate::category::BackPressCategory;
use crate::error::{BackPressError, BackPressResult};

pub const DEFAULT_HISTOGRAM: &str = "Android.BackPress.Intercept";
pub const DEFAULT_ESCAPE_HISTOGRAM: &str = "Android.BackPress.Escape";

/// Category → histogram sample lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMetricIds {
    ids: EnumMap<BackPressCategory, i32>,
}

impl CategoryMetricIds {
    /// Identity mapping: each category reports its ordinal.
    pub fn new() -> Self {
        Self {
            ids: EnumMap::from_fn(|category: BackPressCategory| i32::from(category.ordinal())),
        }
    }

    /// Apply overrides keyed by category name.
    pub fn with_overrides(overrides: &BTreeMap<String, i32>) -> BackPressResult<Self> {
        let mut table = Self::new();

        for (name, &id) in overrides {
            let category: BackPressCategory = name.parse()?;
            if id < 0 {
                return Err(BackPressError::InvalidMetricId {
                    category: CompactString::new(name),
                    id,
                });
            }
            table.ids[category] = id;
        }

        Ok(table)
    }

    #[inline]
    pub fn id(&self, category: BackPressCategory) -> i32 {
        self.ids[category]
    }

    /// Exclusive upper bound for enumeration histograms, saturating at
    /// `i32::MAX`.
    pub fn boundary(&self) -> i32 {
        self.ids
            .values()
            .copied()
            .max()
            .map_or(0, |max| max.saturating_add(1))
    }
}

impl Default for CategoryMetricIds {
    fn default() -> Self {
        Self::new()
    }
}

/// Sink for enumeration samples.
pub trait MetricsRecorder: Send + Sync {
    fn record_enumeration(&self, histogram: &str, sample: i32, boundary: i32);
}

/// Reports samples as `tracing` events under the `backpress::metrics` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetricsRecorder;

impl MetricsRecorder for TracingMetricsRecorder {
    fn record_enumeration(&self, histogram: &str, sample: i32, boundary: i32) {
        info!(
            target: "backpress::metrics",
            marker = "HISTOGRAM_SAMPLE",
            histogram,
            sample,
            boundary,
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub histogram: CompactString,
    pub sample: i32,
}

/// Keeps every sample in memory; meant for tests and the harness stats view.
#[derive(Debug, Default)]
pub struct InMemoryMetricsRecorder {
    samples: Mutex<Vec<Sample>>,
}

impl InMemoryMetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.samples.lock().clone()
    }

    pub fn count(&self, histogram: &str, sample: i32) -> usize {
        self.samples
            .lock()
            .iter()
            .filter(|s| s.histogram == histogram && s.sample == sample)
            .count()
    }

    pub fn total(&self, histogram: &str) -> usize {
        self.samples
            .lock()
            .iter()
            .filter(|s| s.histogram == histogram)
            .count()
    }

    pub fn clear(&self) {
        self.samples.lock().clear();
    }
}

impl MetricsRecorder for InMemoryMetricsRecorder {
    fn record_enumeration(&self, histogram: &str, sample: i32, _boundary: i32) {
        self.samples.lock().push(Sample {
            histogram: CompactString::new(histogram),
            sample,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_mapping() {
        let ids = CategoryMetricIds::new();
        assert_eq!(ids.id(BackPressCategory::BottomSheet), 5);
        assert_eq!(ids.id(BackPressCategory::TabSwitcher), 9);
        assert_eq!(ids.boundary(), BackPressCategory::COUNT as i32);
    }

    #[test]
    fn test_overrides() {
        let mut overrides = BTreeMap::new();
        overrides.insert("find-toolbar".to_string(), 40);

        let ids = CategoryMetricIds::with_overrides(&overrides).unwrap();
        assert_eq!(ids.id(BackPressCategory::FindToolbar), 40);
        assert_eq!(ids.id(BackPressCategory::TextBubble), 0);
        assert_eq!(ids.boundary(), 41);
    }

    #[test]
    fn test_boundary_saturates_at_largest_id() {
        let mut overrides = BTreeMap::new();
        overrides.insert("bottom-sheet".to_string(), i32::MAX);

        let ids = CategoryMetricIds::with_overrides(&overrides).unwrap();
        assert_eq!(ids.id(BackPressCategory::BottomSheet), i32::MAX);
        assert_eq!(ids.boundary(), i32::MAX);
    }

    #[test]
    fn test_overrides_reject_bad_input() {
        let mut overrides = BTreeMap::new();
        overrides.insert("no-such-thing".to_string(), 1);
        assert!(matches!(
            CategoryMetricIds::with_overrides(&overrides),
            Err(BackPressError::UnknownCategory(_))
        ));

        let mut overrides = BTreeMap::new();
        overrides.insert("fullscreen".to_string(), -1);
        assert!(matches!(
            CategoryMetricIds::with_overrides(&overrides),
            Err(BackPressError::InvalidMetricId { id: -1, .. })
        ));
    }

    #[test]
    fn test_in_memory_recorder_counts() {
        let recorder = InMemoryMetricsRecorder::new();
        recorder.record_enumeration("a", 1, 10);
        recorder.record_enumeration("a", 1, 10);
        recorder.record_enumeration("a", 2, 10);
        recorder.record_enumeration("b", 1, 10);

        assert_eq!(recorder.count("a", 1), 2);
        assert_eq!(recorder.total("a"), 3);
        assert_eq!(recorder.total("b"), 1);

        recorder.clear();
        assert!(recorder.samples().is_empty());
    }
}
