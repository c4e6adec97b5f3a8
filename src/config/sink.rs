//! Analytics sink configuration.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::events::sink::DEFAULT_SINK_TIMEOUT;
use crate::events::{AnalyticsSink, HttpSink, LogSink, NullSink};

use super::validation::{ConfigError, expand_env_vars, require_http_url, require_positive};

/// Which sink receives flushed batches.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SinkKind {
    /// Drop every batch.
    None,
    /// Write batches to the log.
    #[default]
    Log,
    /// POST batches to `url`.
    Http,
}

/// Analytics sink settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,

    /// Endpoint for the `http` sink.
    pub url: Option<String>,

    /// Extra request headers. Values support `${VAR}` and `${VAR:-default}`.
    pub headers: BTreeMap<String, String>,

    /// Request timeout (default: "5s").
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::default(),
            url: None,
            headers: BTreeMap::new(),
            timeout: DEFAULT_SINK_TIMEOUT,
        }
    }
}

impl SinkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kind != SinkKind::Http {
            return Ok(());
        }
        require_http_url("sink url", self.url.as_deref().unwrap_or_default())?;
        require_positive("sink timeout", self.timeout)
    }

    /// Construct the configured sink.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if the http sink cannot be built.
    pub fn build(&self) -> Result<Arc<dyn AnalyticsSink>, ConfigError> {
        let sink: Arc<dyn AnalyticsSink> = match self.kind {
            SinkKind::None => Arc::new(NullSink),
            SinkKind::Log => Arc::new(LogSink),
            SinkKind::Http => {
                self.validate()?;
                let headers = self
                    .headers
                    .iter()
                    .map(|(k, v)| (k.clone(), expand_env_vars(v)))
                    .collect();
                let url = self.url.clone().unwrap_or_default();
                Arc::new(
                    HttpSink::new(url, headers, self.timeout)
                        .map_err(|e| ConfigError::ValidationError(e.to_string()))?,
                )
            }
        };
        Ok(sink)
    }
}
