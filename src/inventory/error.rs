//! Feed loading error types.
//!
//! None of these escape [`InventoryLoader::load`](super::InventoryLoader::load);
//! every variant degrades to an empty inventory with rotation disabled.

use std::time::Duration;

use thiserror::Error;

/// Reasons a feed could not be turned into inventory.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Transport-level failure (DNS, connect, TLS, body read).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request did not complete within the fetch timeout.
    #[error("feed request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with a non-success status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The body is not a usable feed document.
    #[error("malformed feed: {0}")]
    Malformed(String),
}

impl From<quick_xml::DeError> for FeedError {
    fn from(err: quick_xml::DeError) -> Self {
        Self::Malformed(err.to_string())
    }
}
