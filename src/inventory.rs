//! Inventory Layer
//!
//! Turns the remote feed into normalized [`AdRecord`]s.
//!
//! - [`InventoryLoader`]: uncached, time-bounded fetch that never fails past its boundary
//! - [`parse_feed`]: XML feed document to [`LoadedFeed`]
//! - [`AdRecord`] / [`AdId`]: immutable records keyed by a content fingerprint

mod error;
pub mod feed;
mod loader;
pub mod record;

pub use error::FeedError;
pub use feed::{FeedDefaults, LoadedFeed, MAX_ROTATION_INTERVAL, parse_feed};
pub use loader::{DEFAULT_FEED_TIMEOUT, InventoryLoader};
pub use record::{AdId, AdRecord, MAX_WEIGHT};
