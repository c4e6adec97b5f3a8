//! Event Layer
//!
//! Engagement events are batched in memory and delivered to an external
//! analytics sink in grouped calls.
//!
//! - [`EventBatcher`]: per-kind buffers, sponsor dedup, click debounce, flush
//! - [`AnalyticsSink`]: delivery trait ([`NullSink`], [`LogSink`], [`MemorySink`], [`HttpSink`])
//! - [`BatchedEvent`] / [`SinkBatch`] / [`AdEvent`]: payload types

mod batcher;
pub mod sink;
mod types;

pub use batcher::{
    DEFAULT_CLICK_DEBOUNCE, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_BATCH, EventBatcher, FlushStats,
};
pub use sink::{
    AnalyticsSink, DEFAULT_SINK_TIMEOUT, HttpSink, LogSink, MemorySink, NullSink, SinkError,
};
pub use types::{AdEvent, BatchedEvent, EventKind, SinkBatch};
