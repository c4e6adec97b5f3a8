//! adengine - Embedded Ad Engine
//!
//! Loads a small ad inventory from a remote XML feed, places ads into page
//! slots under weight and daily frequency-cap policy, records impressions and
//! clicks, and forwards them in batches to an analytics sink. It can be used
//! as a library by a host application, or run as a standalone binary with the
//! `adengine` executable.
//!
//! # Architecture
//!
//! - **Inventory**: feed fetch and normalization into [`AdRecord`]s
//! - **Selector**: weighted, frequency-capped choice per slot
//! - **Storage**: persisted metrics and dismissed set with daily reset
//! - **Events**: batched click/impression/sponsor delivery to a sink
//! - **Scheduler**: rotation, daily-reset, and flush timers
//! - **Engine**: one explicit instance tying it all together
//! - **Server**: optional HTTP bridge for an external renderer
//!
//! # Example
//!
//! ```rust,no_run
//! use adengine::{Engine, EngineService, InventoryLoader, StorageBuilder, TimerSettings};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::builder()
//!     .storage(StorageBuilder::memory().build().await)
//!     .build()
//!     .await;
//! let loader = InventoryLoader::new(Duration::from_secs(8))?;
//! engine.load_feed(&loader, "https://ads.example.com/feed.xml").await;
//! engine.render_all().await;
//!
//! let service = EngineService::start(engine, &TimerSettings::default()).await?;
//! // ... on host teardown:
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod events;
pub mod inventory;
pub mod scheduler;
pub mod selector;
pub mod server;
pub mod storage;

pub use engine::{
    ChannelRenderer, Engine, EngineBuilder, EngineService, EngineSettings, LogRenderer, Outcome,
    Placement, PlacementId, RenderEvent, Renderer, ReportRow, TimerSettings,
};
pub use events::{AnalyticsSink, EventBatcher, HttpSink, LogSink, MemorySink, NullSink, SinkBatch};
pub use inventory::{AdId, AdRecord, FeedError, InventoryLoader, LoadedFeed};
pub use scheduler::{Schedule, Task, TaskError, TimerRegistry};
pub use selector::{SelectionMode, Selector};
pub use storage::{AdMetric, KvStore, StorageBuilder, StorageDriver, StorageError, StorageHandles};
