//! Persisted per-ad metrics.
//!
//! The whole map lives in memory and is written back as one JSON blob. Reads
//! from a broken backend start from an empty map; failed writes are logged and
//! dropped, so the current session keeps working with in-memory counters.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::inventory::AdId;
use crate::storage::backend::KvStore;
use crate::storage::types::AdMetric;

/// Default persistence key for the metrics blob.
pub const DEFAULT_METRICS_KEY: &str = "adengine.metrics.v1";

/// In-memory metrics map with best-effort persistence.
pub struct MetricsStore {
    store: Arc<dyn KvStore>,
    key: String,
    metrics: BTreeMap<AdId, AdMetric>,
}

impl std::fmt::Debug for MetricsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsStore")
            .field("backend", &self.store.name())
            .field("key", &self.key)
            .field("len", &self.metrics.len())
            .finish()
    }
}

impl MetricsStore {
    /// An empty store that persists to `store` under `key`, without reading it.
    pub fn new(store: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            metrics: BTreeMap::new(),
        }
    }

    /// Load the persisted map.
    ///
    /// Missing, unreadable or corrupt blobs all yield an empty map.
    pub async fn load(store: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        let mut this = Self::new(store, key);
        match this.store.get(&this.key).await {
            Ok(Some(blob)) => match serde_json::from_str(&blob) {
                Ok(metrics) => this.metrics = metrics,
                Err(e) => {
                    tracing::warn!(key = %this.key, error = %e, "Discarding corrupt metrics blob");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    backend = this.store.name(),
                    key = %this.key,
                    error = %e,
                    "Metrics storage unavailable, starting empty"
                );
            }
        }
        tracing::debug!(key = %this.key, entries = this.metrics.len(), "Metrics loaded");
        this
    }

    /// The metric for `id`, created zeroed (stamped `today`) if absent.
    pub fn get(&mut self, id: &AdId, today: NaiveDate) -> &mut AdMetric {
        self.metrics
            .entry(id.clone())
            .or_insert_with(|| AdMetric::new(today))
    }

    /// Read-only lookup; does not create an entry.
    pub fn peek(&self, id: &AdId) -> Option<&AdMetric> {
        self.metrics.get(id)
    }

    /// Impressions since the last reset (0 when unknown).
    pub fn impressions(&self, id: &AdId) -> u32 {
        self.metrics.get(id).map_or(0, |m| m.impressions)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AdId, &AdMetric)> {
        self.metrics.iter()
    }

    /// Write the whole map back. Failures are logged and dropped.
    pub async fn save(&self) {
        let blob = match serde_json::to_string(&self.metrics) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode metrics");
                return;
            }
        };
        if let Err(e) = self.store.set(&self.key, &blob).await {
            tracing::warn!(
                backend = self.store.name(),
                key = %self.key,
                error = %e,
                "Metrics write dropped"
            );
        }
    }

    /// Zero impressions for every metric not yet reset on `today`.
    ///
    /// Returns how many metrics were reset.
    pub fn reset_daily(&mut self, today: NaiveDate) -> usize {
        let reset = self
            .metrics
            .values_mut()
            .map(|m| m.reset_if_stale(today))
            .filter(|&changed| changed)
            .count();
        if reset > 0 {
            tracing::info!(reset, %today, "Daily impression reset");
        }
        reset
    }
}
