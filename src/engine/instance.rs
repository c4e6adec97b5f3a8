//! The engine instance.
//!
//! One [`Engine`] owns everything a widget needs: inventory and selection
//! state, metrics, dismissed set, pending events, and the live placements.
//! Handles are cheap clones sharing the same state. All mutation goes through
//! a single async mutex, so callbacks, timers, and render passes apply in the
//! order they acquire it and never interleave.
//!
//! No operation returns an error. Failures below (feed, storage, sink) are
//! logged and replaced by their fallback.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::engine::builder::{EngineBuilder, EngineSettings};
use crate::engine::renderer::Renderer;
use crate::engine::slots::{Placement, PlacementId, Slots};
use crate::events::{AdEvent, AnalyticsSink, BatchedEvent, EventBatcher, FlushStats};
use crate::inventory::{AdId, AdRecord, InventoryLoader, LoadedFeed, MAX_ROTATION_INTERVAL};
use crate::selector::Selector;
use crate::storage::{AdMetric, DismissedSet, MetricsStore, StorageHandles};

/// Result of a renderer callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The callback changed engine state.
    Applied,
    /// Valid placement, nothing to do (below threshold, debounced, disabled).
    Ignored,
    /// The placement was replaced or removed.
    Stale,
}

/// One line of the diagnostics report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub id: AdId,
    pub title: String,
    pub sponsor: String,
    pub weight: u32,
    pub impressions: u32,
    pub clicks: u32,
    pub ctr_percent: f64,
}

/// Events waiting for the next flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PendingEvents {
    pub clicks: usize,
    pub impressions: usize,
    pub sponsors: usize,
}

struct EngineState {
    selector: Selector,
    metrics: MetricsStore,
    dismissed: DismissedSet,
    batcher: EventBatcher,
    slots: Slots,
    rotation_interval: u64,
}

struct Inner {
    settings: EngineSettings,
    state: Mutex<EngineState>,
    visible: AtomicBool,
    closed: AtomicBool,
    renderer: Arc<dyn Renderer>,
    sink: Arc<dyn AnalyticsSink>,
    storage: StorageHandles,
}

/// Shared handle to one ad engine.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.inner.settings)
            .field("storage", &self.inner.storage)
            .field("sink", &self.inner.sink.name())
            .field("visible", &self.is_visible())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub(crate) async fn open(
        settings: EngineSettings,
        storage: StorageHandles,
        renderer: Arc<dyn Renderer>,
        sink: Arc<dyn AnalyticsSink>,
    ) -> Self {
        let mut metrics = storage.load_metrics().await;
        let dismissed = storage.load_dismissed().await;
        if metrics.reset_daily(today()) > 0 {
            metrics.save().await;
        }

        tracing::info!(
            slots = settings.slots,
            frequency_cap = settings.frequency_cap,
            selection = %settings.selection,
            storage = storage.backend_name(),
            sink = sink.name(),
            known_ads = metrics.len(),
            dismissed = dismissed.len(),
            "Engine ready"
        );

        let state = EngineState {
            selector: Selector::new(settings.selection, settings.frequency_cap, settings.seed),
            metrics,
            dismissed,
            batcher: EventBatcher::new(settings.click_debounce, settings.max_batch),
            slots: Slots::new(settings.slots),
            rotation_interval: 0,
        };

        Self {
            inner: Arc::new(Inner {
                settings,
                state: Mutex::new(state),
                visible: AtomicBool::new(true),
                closed: AtomicBool::new(false),
                renderer,
                sink,
                storage,
            }),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.inner.settings
    }

    pub fn is_visible(&self) -> bool {
        self.inner.visible.load(Ordering::SeqCst)
    }

    /// Whether [`teardown`](Self::teardown) has run.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    // --- Inventory ---

    /// Fetch the feed and install it. Returns the rotation interval (0 on failure).
    ///
    /// The fetch happens without holding the state lock.
    pub async fn load_feed(&self, loader: &InventoryLoader, feed_url: &str) -> u64 {
        let feed = loader.load(feed_url).await;
        self.set_inventory(feed).await
    }

    /// Replace the inventory and restart selection. Returns the rotation
    /// interval, clamped to [`MAX_ROTATION_INTERVAL`].
    pub async fn set_inventory(&self, feed: LoadedFeed) -> u64 {
        let rotation_interval = feed.rotation_interval.min(MAX_ROTATION_INTERVAL);
        let mut state = self.inner.state.lock().await;
        tracing::debug!(
            ads = feed.ads.len(),
            rotation_interval,
            "Inventory installed"
        );
        state.selector.set_inventory(feed.ads);
        state.rotation_interval = rotation_interval;
        rotation_interval
    }

    /// Seconds between rotations from the last loaded feed (0 = no rotation).
    pub async fn rotation_interval(&self) -> u64 {
        self.inner.state.lock().await.rotation_interval
    }

    pub async fn inventory(&self) -> Vec<AdRecord> {
        self.inner.state.lock().await.selector.inventory().to_vec()
    }

    // --- Rendering ---

    /// Re-select and re-render every slot. Returns the resulting slots.
    ///
    /// No ad appears twice in one pass unless the inventory has fewer
    /// selectable ads than slots.
    pub async fn render_all(&self) -> Vec<Option<Placement>> {
        let mut state = self.inner.state.lock().await;
        if self.is_closed() {
            return state.slots.snapshot();
        }

        let today = today();
        let renderer = &self.inner.renderer;
        let dismiss_enabled = self.inner.settings.dismiss_enabled;
        let EngineState {
            selector,
            metrics,
            dismissed,
            slots,
            ..
        } = &mut *state;

        let mut excluded = HashSet::with_capacity(slots.count());
        for slot in 0..slots.count() {
            let choice = selector.next(
                &excluded,
                |id| dismiss_enabled && dismissed.contains(id),
                |id| metrics.impressions(id),
            );
            match choice {
                Some(ad) => {
                    excluded.insert(ad.id.clone());
                    let metric = metrics.get(&ad.id, today);
                    metric.title.clone_from(&ad.title);
                    metric.href.clone_from(&ad.href);

                    let (placement, previous) = slots.place(slot, ad);
                    if let Some(previous) = previous {
                        renderer.unmount(&previous);
                    }
                    renderer.mount(&placement);
                }
                None => {
                    if let Some(previous) = slots.clear(slot) {
                        renderer.unmount(&previous);
                    }
                    renderer.mount_empty(slot);
                }
            }
        }

        metrics.save().await;
        log_report(&build_report(&state));
        state.slots.snapshot()
    }

    /// One rotation tick: a full render pass, skipped while the page is hidden.
    ///
    /// Returns whether a pass ran.
    pub async fn rotate(&self) -> bool {
        if self.is_closed() {
            return false;
        }
        if !self.is_visible() {
            tracing::trace!("Page hidden, rotation tick skipped");
            return false;
        }
        self.render_all().await;
        true
    }

    /// Current slots.
    pub async fn placements(&self) -> Vec<Option<Placement>> {
        self.inner.state.lock().await.slots.snapshot()
    }

    // --- Renderer callbacks ---

    /// The placement is `ratio` visible. The first report at or above the
    /// visibility threshold records one impression and a sponsor-seen event.
    pub async fn report_visibility(&self, id: PlacementId, ratio: f64) -> Outcome {
        let mut state = self.inner.state.lock().await;
        if self.is_closed() {
            return Outcome::Ignored;
        }
        let threshold = self.inner.settings.visibility_threshold;
        let EngineState {
            slots,
            metrics,
            batcher,
            ..
        } = &mut *state;

        let Some(placement) = slots.find_mut(id) else {
            return Outcome::Stale;
        };
        // NaN never reaches the threshold.
        if placement.impression_recorded || !(ratio >= threshold) {
            return Outcome::Ignored;
        }
        placement.impression_recorded = true;
        let (ad, slot) = (placement.ad.clone(), placement.slot);

        let metric = metrics.get(&ad.id, today());
        metric.impressions = metric.impressions.saturating_add(1);
        tracing::debug!(ad = %ad.id, slot, impressions = metric.impressions, "Impression recorded");

        batcher.enqueue(BatchedEvent::Impression(AdEvent::new(&ad, slot)));
        batcher.enqueue(BatchedEvent::Sponsor(ad.sponsor_name.clone()));
        if batcher.should_flush() {
            batcher.flush(self.inner.sink.as_ref());
        }
        metrics.save().await;
        Outcome::Applied
    }

    /// The placement's destination link was activated.
    ///
    /// Repeated activations of the same ad within the debounce window are
    /// ignored entirely.
    pub async fn activate(&self, id: PlacementId) -> Outcome {
        let mut state = self.inner.state.lock().await;
        if self.is_closed() {
            return Outcome::Ignored;
        }
        let EngineState {
            slots,
            metrics,
            batcher,
            ..
        } = &mut *state;

        let Some(placement) = slots.find(id) else {
            return Outcome::Stale;
        };
        let (ad, slot) = (placement.ad.clone(), placement.slot);
        if !batcher.accept_click(&ad.id, Instant::now()) {
            return Outcome::Ignored;
        }

        let metric = metrics.get(&ad.id, today());
        metric.clicks = metric.clicks.saturating_add(1);
        tracing::debug!(ad = %ad.id, slot, clicks = metric.clicks, "Click recorded");

        batcher.enqueue(BatchedEvent::Click(AdEvent::new(&ad, slot)));
        if batcher.should_flush() {
            batcher.flush(self.inner.sink.as_ref());
        }
        metrics.save().await;
        Outcome::Applied
    }

    /// Remove the placement from its slot. A `permanent` dismissal also keeps
    /// the ad out of every later render pass.
    pub async fn dismiss(&self, id: PlacementId, permanent: bool) -> Outcome {
        let mut state = self.inner.state.lock().await;
        if self.is_closed() || !self.inner.settings.dismiss_enabled {
            return Outcome::Ignored;
        }
        let Some(placement) = state.slots.remove(id) else {
            return Outcome::Stale;
        };
        self.inner.renderer.unmount(&placement);
        tracing::debug!(ad = %placement.ad.id, slot = placement.slot, permanent, "Ad dismissed");

        if permanent
            && state.dismissed.insert(placement.ad.id.clone())
            && self.inner.settings.dismiss_persist
        {
            state.dismissed.save().await;
        }
        Outcome::Applied
    }

    // --- Page lifecycle ---

    /// Record page visibility. Becoming hidden flushes pending events.
    pub async fn set_visibility(&self, visible: bool) {
        let was_visible = self.inner.visible.swap(visible, Ordering::SeqCst);
        if was_visible == visible {
            return;
        }
        tracing::debug!(visible, "Page visibility changed");
        if !visible {
            self.flush().await;
        }
    }

    /// Deliver pending events to the sink.
    pub async fn flush(&self) -> FlushStats {
        let mut state = self.inner.state.lock().await;
        state.batcher.prune_debounce(Instant::now());
        state.batcher.flush(self.inner.sink.as_ref())
    }

    pub async fn pending_events(&self) -> PendingEvents {
        let state = self.inner.state.lock().await;
        PendingEvents {
            clicks: state.batcher.pending_clicks(),
            impressions: state.batcher.pending_impressions(),
            sponsors: state.batcher.pending_sponsors(),
        }
    }

    // --- Metrics ---

    /// Daily impression reset against the local calendar date.
    pub async fn reset_daily(&self) -> usize {
        self.reset_daily_at(today()).await
    }

    /// Daily impression reset against `today`. Returns how many metrics changed.
    pub async fn reset_daily_at(&self, today: NaiveDate) -> usize {
        let mut state = self.inner.state.lock().await;
        let reset = state.metrics.reset_daily(today);
        if reset > 0 {
            state.metrics.save().await;
        }
        reset
    }

    /// Stored metric for `id`, if any.
    pub async fn metric(&self, id: &AdId) -> Option<AdMetric> {
        self.inner.state.lock().await.metrics.peek(id).cloned()
    }

    /// Per-ad counters for the current inventory.
    pub async fn report(&self) -> Vec<ReportRow> {
        build_report(&*self.inner.state.lock().await)
    }

    /// Final flush, unmount every placement, persist, and release storage.
    ///
    /// Idempotent. Callbacks after teardown are ignored.
    pub async fn teardown(&self) {
        let mut state = self.inner.state.lock().await;
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let stats = state.batcher.flush(self.inner.sink.as_ref());
        for placement in state.slots.drain() {
            self.inner.renderer.unmount(&placement);
        }
        state.metrics.save().await;
        self.inner.storage.shutdown().await;
        tracing::info!(flushed_calls = stats.calls, "Engine torn down");
    }
}

fn build_report(state: &EngineState) -> Vec<ReportRow> {
    state
        .selector
        .inventory()
        .iter()
        .map(|ad| {
            let metric = state.metrics.peek(&ad.id).cloned().unwrap_or_default();
            ReportRow {
                id: ad.id.clone(),
                title: ad.title.clone(),
                sponsor: ad.sponsor_name.clone(),
                weight: ad.weight,
                impressions: metric.impressions,
                clicks: metric.clicks,
                ctr_percent: metric.ctr_percent(),
            }
        })
        .collect()
}

fn log_report(rows: &[ReportRow]) {
    for row in rows {
        tracing::debug!(
            ad = %row.id,
            title = %row.title,
            sponsor = %row.sponsor,
            weight = row.weight,
            impressions = row.impressions,
            clicks = row.clicks,
            ctr = format_args!("{:.2}%", row.ctr_percent),
            "Ad report"
        );
    }
}
