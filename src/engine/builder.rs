//! Engine settings and builder.

use std::sync::Arc;
use std::time::Duration;

use crate::engine::instance::Engine;
use crate::engine::renderer::{LogRenderer, Renderer};
use crate::events::{AnalyticsSink, DEFAULT_CLICK_DEBOUNCE, DEFAULT_MAX_BATCH, NullSink};
use crate::selector::{DEFAULT_FREQUENCY_CAP, SelectionMode};
use crate::storage::{StorageBuilder, StorageHandles};

/// Default fraction of an ad that must be on screen to count an impression.
pub const DEFAULT_VISIBILITY_THRESHOLD: f64 = 0.5;

/// Tunables of one engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Number of ad slots on the page.
    pub slots: usize,
    /// Daily impressions after which an ad is deprioritized.
    pub frequency_cap: u32,
    pub selection: SelectionMode,
    /// Fixed RNG seed for reproducible shuffles.
    pub seed: Option<u64>,
    /// Allow users to dismiss ads.
    pub dismiss_enabled: bool,
    /// Persist permanent dismissals across sessions.
    pub dismiss_persist: bool,
    /// Visible fraction in `(0, 1]` that counts as an impression.
    pub visibility_threshold: f64,
    pub click_debounce: Duration,
    /// Per-kind buffer size that triggers an immediate flush.
    pub max_batch: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            slots: 1,
            frequency_cap: DEFAULT_FREQUENCY_CAP,
            selection: SelectionMode::default(),
            seed: None,
            dismiss_enabled: true,
            dismiss_persist: true,
            visibility_threshold: DEFAULT_VISIBILITY_THRESHOLD,
            click_debounce: DEFAULT_CLICK_DEBOUNCE,
            max_batch: DEFAULT_MAX_BATCH,
        }
    }
}

/// Builder for [`Engine`].
///
/// Defaults: in-memory storage, [`LogRenderer`], [`NullSink`].
pub struct EngineBuilder {
    settings: EngineSettings,
    storage: Option<StorageHandles>,
    renderer: Arc<dyn Renderer>,
    sink: Arc<dyn AnalyticsSink>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            settings: EngineSettings::default(),
            storage: None,
            renderer: Arc::new(LogRenderer),
            sink: Arc::new(NullSink),
        }
    }

    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn storage(mut self, storage: StorageHandles) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn renderer(mut self, renderer: impl Renderer) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn AnalyticsSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Load persisted state and run the startup daily-reset pass.
    pub async fn build(self) -> Engine {
        let storage = match self.storage {
            Some(storage) => storage,
            None => StorageBuilder::memory().build().await,
        };
        Engine::open(self.settings, storage, self.renderer, self.sink).await
    }
}
