//! Analytics sinks.
//!
//! A sink receives at most one call per event kind per flush. Calls are
//! fire-and-forget: nothing is awaited or retried, and a missing or broken
//! sink never changes engine behaviour.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use thiserror::Error;

use crate::events::types::SinkBatch;

/// Default delivery timeout for the HTTP sink (5 seconds).
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors a sink may report synchronously.
#[derive(Debug, Error)]
pub enum SinkError {
    /// No delivery path right now (no runtime, endpoint not configured).
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    /// The batch could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The sink could not be constructed or rejected the batch outright.
    #[error("delivery error: {0}")]
    Delivery(String),
}

/// External reporting endpoint for batched events.
pub trait AnalyticsSink: Send + Sync + 'static {
    /// Short sink name for logs.
    fn name(&self) -> &str;

    /// Hand over one batch. Must not block.
    fn report(&self, batch: SinkBatch) -> Result<(), SinkError>;
}

// =============================================================================
// Null
// =============================================================================

/// Drops every batch. Used when no sink is configured.
#[derive(Debug, Clone, Default)]
pub struct NullSink;

impl AnalyticsSink for NullSink {
    fn name(&self) -> &str {
        "null"
    }

    fn report(&self, batch: SinkBatch) -> Result<(), SinkError> {
        tracing::trace!(kind = %batch.kind(), items = batch.len(), "No sink configured, batch dropped");
        Ok(())
    }
}

// =============================================================================
// Log
// =============================================================================

/// Writes every batch to the log.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl AnalyticsSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn report(&self, batch: SinkBatch) -> Result<(), SinkError> {
        match &batch {
            SinkBatch::Clicks(events) | SinkBatch::Impressions(events) => {
                for event in events {
                    tracing::info!(
                        kind = %batch.kind(),
                        ad = %event.ad_id,
                        title = %event.title,
                        sponsor = %event.sponsor,
                        slot = event.slot,
                        ts = %event.ts,
                        "Ad event"
                    );
                }
            }
            SinkBatch::Sponsors(names) => {
                tracing::info!(sponsors = ?names, "Sponsors seen");
            }
        }
        Ok(())
    }
}

// =============================================================================
// Memory
// =============================================================================

/// Keeps every batch in memory. Handy for hosts that poll, and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    batches: Arc<Mutex<Vec<SinkBatch>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every batch received so far, in order.
    pub fn batches(&self) -> Vec<SinkBatch> {
        self.batches
            .lock()
            .map(|batches| batches.clone())
            .unwrap_or_default()
    }

    /// Number of `report` calls received.
    pub fn calls(&self) -> usize {
        self.batches.lock().map(|b| b.len()).unwrap_or(0)
    }
}

impl AnalyticsSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn report(&self, batch: SinkBatch) -> Result<(), SinkError> {
        self.batches
            .lock()
            .map_err(|_| SinkError::Delivery("memory sink lock poisoned".to_string()))?
            .push(batch);
        Ok(())
    }
}

// =============================================================================
// HTTP
// =============================================================================

/// POSTs each batch as JSON to an analytics endpoint.
///
/// Body: `{"kind": "clicks" | "impressions" | "sponsors", "items": [...], "sent_at": "..."}`.
/// The request is spawned onto the current Tokio runtime and not awaited.
#[derive(Clone)]
pub struct HttpSink {
    client: Client,
    url: String,
    headers: BTreeMap<String, String>,
}

impl std::fmt::Debug for HttpSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSink")
            .field("url", &self.url)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl HttpSink {
    /// Create an HTTP sink.
    ///
    /// # Errors
    /// Returns `SinkError::Delivery` if the HTTP client cannot be built.
    pub fn new(
        url: impl Into<String>,
        headers: BTreeMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Delivery(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            headers,
        })
    }
}

impl AnalyticsSink for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    fn report(&self, batch: SinkBatch) -> Result<(), SinkError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| SinkError::Unavailable("no async runtime".to_string()))?;

        let kind = batch.kind();
        let items = batch.len();
        let mut body = serde_json::to_value(&batch)?;
        body["sent_at"] = serde_json::json!(Utc::now());

        let mut request = self.client.post(&self.url).json(&body);
        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        let url = self.url.clone();

        runtime.spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(url = %url, %kind, items, "Batch delivered");
                }
                Ok(response) => {
                    tracing::warn!(
                        url = %url,
                        %kind,
                        status = response.status().as_u16(),
                        "Analytics endpoint rejected batch"
                    );
                }
                Err(e) => {
                    tracing::warn!(url = %url, %kind, error = %e, "Batch delivery failed");
                }
            }
        });
        Ok(())
    }
}
