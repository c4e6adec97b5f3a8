//! Remote feed loader.
//!
//! Issues one uncached GET per load, bounded by a fixed timeout. Every failure
//! degrades to an empty inventory with rotation disabled.

use std::time::{Duration, Instant};

use reqwest::Client;
use reqwest::header::{CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA};
use tokio::time::timeout;

use crate::inventory::FeedError;
use crate::inventory::feed::{FeedDefaults, LoadedFeed, parse_feed};

/// Default fetch timeout (8 seconds).
pub const DEFAULT_FEED_TIMEOUT: Duration = Duration::from_secs(8);

/// Loads and normalizes the ad feed.
#[derive(Clone)]
pub struct InventoryLoader {
    client: Client,
    timeout: Duration,
    defaults: FeedDefaults,
}

impl std::fmt::Debug for InventoryLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryLoader")
            .field("timeout", &self.timeout)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl InventoryLoader {
    /// Create a loader with the given fetch timeout.
    ///
    /// # Errors
    /// Returns `FeedError::Network` if the HTTP client cannot be built.
    pub fn new(fetch_timeout: Duration) -> Result<Self, FeedError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, max-age=0"),
        );
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            timeout: fetch_timeout,
            defaults: FeedDefaults::default(),
        })
    }

    /// Override the values used for missing feed fields.
    pub fn with_defaults(mut self, defaults: FeedDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch and parse the feed.
    ///
    /// Never fails: network errors, timeouts, non-success statuses and
    /// malformed bodies all yield [`LoadedFeed::empty`].
    pub async fn load(&self, feed_url: &str) -> LoadedFeed {
        let start = Instant::now();
        match self.try_load(feed_url).await {
            Ok(feed) => {
                tracing::info!(
                    url = %feed_url,
                    ads = feed.ads.len(),
                    rotation_interval = feed.rotation_interval,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Feed loaded"
                );
                feed
            }
            Err(e) => {
                tracing::warn!(url = %feed_url, error = %e, "Feed unavailable, serving no ads");
                LoadedFeed::empty()
            }
        }
    }

    /// Fetch and parse the feed, surfacing the failure reason.
    ///
    /// Dropping the in-flight request on timeout aborts it.
    pub async fn try_load(&self, feed_url: &str) -> Result<LoadedFeed, FeedError> {
        let fetch = async {
            let response = self.client.get(feed_url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FeedError::Status(status.as_u16()));
            }
            Ok(response.text().await?)
        };

        let body = timeout(self.timeout, fetch)
            .await
            .map_err(|_| FeedError::Timeout(self.timeout))??;

        parse_feed(&body, &self.defaults)
    }
}
