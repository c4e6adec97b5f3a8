//! Core data types for the storage layer.
//!
//! - [`AdMetric`]: per-ad engagement counters persisted across sessions

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Engagement counters for one ad, keyed by its fingerprint.
///
/// Every field defaults so that blobs written by older builds (or edited by
/// hand) still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdMetric {
    /// Impressions since the last daily reset.
    pub impressions: u32,
    /// Lifetime click count.
    pub clicks: u32,
    /// Title of the ad when it was last shown (diagnostics only).
    pub title: String,
    /// Destination of the ad when it was last shown (diagnostics only).
    pub href: String,
    /// Calendar day the impression counter was last reset.
    pub last_reset_day: Option<NaiveDate>,
}

impl AdMetric {
    /// A zeroed metric stamped with `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            last_reset_day: Some(today),
            ..Self::default()
        }
    }

    /// Click-through rate in percent (0 when never shown).
    pub fn ctr_percent(&self) -> f64 {
        if self.impressions == 0 {
            0.0
        } else {
            f64::from(self.clicks) / f64::from(self.impressions) * 100.0
        }
    }

    /// Zero the impression counter if it was last reset on another day.
    ///
    /// Returns `true` when a reset happened.
    pub fn reset_if_stale(&mut self, today: NaiveDate) -> bool {
        if self.last_reset_day == Some(today) {
            return false;
        }
        self.impressions = 0;
        self.last_reset_day = Some(today);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_ctr_percent() {
        let mut metric = AdMetric::new(day(1));
        assert_eq!(metric.ctr_percent(), 0.0);
        metric.impressions = 4;
        metric.clicks = 1;
        assert!((metric.ctr_percent() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset_if_stale_same_day_is_noop() {
        let mut metric = AdMetric::new(day(2));
        metric.impressions = 3;
        assert!(!metric.reset_if_stale(day(2)));
        assert_eq!(metric.impressions, 3);
    }

    #[test]
    fn test_reset_if_stale_keeps_clicks() {
        let mut metric = AdMetric::new(day(1));
        metric.impressions = 5;
        metric.clicks = 2;
        assert!(metric.reset_if_stale(day(2)));
        assert_eq!(metric.impressions, 0);
        assert_eq!(metric.clicks, 2);
        assert_eq!(metric.last_reset_day, Some(day(2)));
    }

    #[test]
    fn test_deserialize_partial_blob() {
        let metric: AdMetric = serde_json::from_str(r#"{"impressions": 2}"#).unwrap();
        assert_eq!(metric.impressions, 2);
        assert_eq!(metric.clicks, 0);
        assert_eq!(metric.last_reset_day, None);
    }
}
