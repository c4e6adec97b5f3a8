//! Permanently dismissed ads for this profile.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::inventory::AdId;
use crate::storage::backend::KvStore;

/// Default persistence key for the dismissed set.
pub const DEFAULT_DISMISSED_KEY: &str = "adengine.dismissed.v1";

/// Set of ad identifiers the user has hidden, persisted as a JSON array.
pub struct DismissedSet {
    store: Arc<dyn KvStore>,
    key: String,
    ids: BTreeSet<AdId>,
}

impl std::fmt::Debug for DismissedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DismissedSet")
            .field("backend", &self.store.name())
            .field("ids", &self.ids)
            .finish()
    }
}

impl DismissedSet {
    pub fn new(store: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            ids: BTreeSet::new(),
        }
    }

    /// Load the persisted set; any failure yields an empty set.
    pub async fn load(store: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        let mut this = Self::new(store, key);
        match this.store.get(&this.key).await {
            Ok(Some(blob)) => match serde_json::from_str(&blob) {
                Ok(ids) => this.ids = ids,
                Err(e) => {
                    tracing::warn!(key = %this.key, error = %e, "Discarding corrupt dismissed set");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    backend = this.store.name(),
                    key = %this.key,
                    error = %e,
                    "Dismissed set unavailable, starting empty"
                );
            }
        }
        this
    }

    pub fn contains(&self, id: &AdId) -> bool {
        self.ids.contains(id)
    }

    /// Add an id. Returns `false` if it was already dismissed.
    pub fn insert(&mut self, id: AdId) -> bool {
        self.ids.insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Persist the set. Failures are logged and dropped.
    pub async fn save(&self) {
        let blob = match serde_json::to_string(&self.ids) {
            Ok(blob) => blob,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode dismissed set");
                return;
            }
        };
        if let Err(e) = self.store.set(&self.key, &blob).await {
            tracing::warn!(
                backend = self.store.name(),
                key = %self.key,
                error = %e,
                "Dismissed set write dropped"
            );
        }
    }
}
