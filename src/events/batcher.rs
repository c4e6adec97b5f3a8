//! In-memory event batching with per-ad click debounce.
//!
//! Clicks and impressions accumulate in ordered buffers, sponsor names in a
//! deduplicating set. [`EventBatcher::flush`] hands every non-empty buffer to
//! the sink in one call per kind and clears it, whether or not the sink
//! accepted the batch.

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::events::sink::AnalyticsSink;
use crate::events::types::{AdEvent, BatchedEvent, SinkBatch};
use crate::inventory::AdId;

/// Default flush cadence (5 seconds).
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Default window in which repeated clicks on the same ad are ignored.
pub const DEFAULT_CLICK_DEBOUNCE: Duration = Duration::from_millis(1500);

/// Default per-kind buffer size that triggers an early flush.
pub const DEFAULT_MAX_BATCH: usize = 500;

/// Buffer for one event kind.
#[derive(Debug)]
struct BatchBuffer<T> {
    items: Vec<T>,
}

impl<T> BatchBuffer<T> {
    fn new() -> Self {
        Self { items: Vec::new() }
    }

    fn push(&mut self, item: T) {
        self.items.push(item);
    }

    fn take(&mut self) -> Vec<T> {
        std::mem::take(&mut self.items)
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// What a flush delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushStats {
    /// Number of sink calls made.
    pub calls: usize,
    pub clicks: usize,
    pub impressions: usize,
    pub sponsors: usize,
}

/// Pending events awaiting the next flush.
#[derive(Debug)]
pub struct EventBatcher {
    clicks: BatchBuffer<AdEvent>,
    impressions: BatchBuffer<AdEvent>,
    sponsors: BTreeSet<String>,
    click_debounce: Duration,
    max_batch: usize,
    last_click: HashMap<AdId, Instant>,
}

impl Default for EventBatcher {
    fn default() -> Self {
        Self::new(DEFAULT_CLICK_DEBOUNCE, DEFAULT_MAX_BATCH)
    }
}

impl EventBatcher {
    pub fn new(click_debounce: Duration, max_batch: usize) -> Self {
        Self {
            clicks: BatchBuffer::new(),
            impressions: BatchBuffer::new(),
            sponsors: BTreeSet::new(),
            click_debounce,
            max_batch: max_batch.max(1),
            last_click: HashMap::new(),
        }
    }

    /// Decide whether a click on `id` at `now` counts.
    ///
    /// A click within the debounce window of the last *accepted* click on the
    /// same ad is rejected and does not extend the window.
    pub fn accept_click(&mut self, id: &AdId, now: Instant) -> bool {
        if let Some(last) = self.last_click.get(id)
            && now.saturating_duration_since(*last) < self.click_debounce
        {
            tracing::debug!(ad = %id, "Click debounced");
            return false;
        }
        self.last_click.insert(id.clone(), now);
        true
    }

    /// Queue an event for the next flush.
    pub fn enqueue(&mut self, event: BatchedEvent) {
        match event {
            BatchedEvent::Click(event) => self.clicks.push(event),
            BatchedEvent::Impression(event) => self.impressions.push(event),
            BatchedEvent::Sponsor(name) => {
                self.sponsors.insert(name);
            }
        }
    }

    /// A per-kind buffer has reached the size limit.
    pub fn should_flush(&self) -> bool {
        self.clicks.len() >= self.max_batch
            || self.impressions.len() >= self.max_batch
            || self.sponsors.len() >= self.max_batch
    }

    pub fn pending_clicks(&self) -> usize {
        self.clicks.len()
    }

    pub fn pending_impressions(&self) -> usize {
        self.impressions.len()
    }

    pub fn pending_sponsors(&self) -> usize {
        self.sponsors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clicks.is_empty() && self.impressions.is_empty() && self.sponsors.is_empty()
    }

    /// Deliver every non-empty buffer, one sink call per kind, and clear them.
    ///
    /// Sink errors are logged; the events are dropped either way.
    pub fn flush(&mut self, sink: &dyn AnalyticsSink) -> FlushStats {
        let mut stats = FlushStats::default();

        if !self.clicks.is_empty() {
            let items = self.clicks.take();
            stats.clicks = items.len();
            deliver(sink, SinkBatch::Clicks(items));
            stats.calls += 1;
        }
        if !self.impressions.is_empty() {
            let items = self.impressions.take();
            stats.impressions = items.len();
            deliver(sink, SinkBatch::Impressions(items));
            stats.calls += 1;
        }
        if !self.sponsors.is_empty() {
            let names: Vec<String> = std::mem::take(&mut self.sponsors).into_iter().collect();
            stats.sponsors = names.len();
            deliver(sink, SinkBatch::Sponsors(names));
            stats.calls += 1;
        }

        if stats.calls > 0 {
            tracing::debug!(
                sink = sink.name(),
                clicks = stats.clicks,
                impressions = stats.impressions,
                sponsors = stats.sponsors,
                "Event batch flushed"
            );
        }
        stats
    }

    /// Forget debounce entries older than the window.
    pub fn prune_debounce(&mut self, now: Instant) {
        let window = self.click_debounce;
        self.last_click
            .retain(|_, last| now.saturating_duration_since(*last) < window);
    }
}

fn deliver(sink: &dyn AnalyticsSink, batch: SinkBatch) {
    let kind = batch.kind();
    let items = batch.len();
    if let Err(e) = sink.report(batch) {
        tracing::warn!(sink = sink.name(), %kind, items, error = %e, "Sink rejected batch, events dropped");
    }
}
