//! Engine, batching, and daily-reset configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{DEFAULT_VISIBILITY_THRESHOLD, EngineSettings};
use crate::events::{DEFAULT_CLICK_DEBOUNCE, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_BATCH};
use crate::scheduler::{DEFAULT_RESET_CHECK_INTERVAL, Schedule};
use crate::selector::{DEFAULT_FREQUENCY_CAP, SelectionMode};

use super::validation::ConfigError;

// =============================================================================
// Engine
// =============================================================================

/// Dismiss affordance settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DismissConfig {
    /// Let users dismiss ads (default: true).
    pub enabled: bool,
    /// Remember permanent dismissals across sessions (default: true).
    pub persist: bool,
}

impl Default for DismissConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            persist: true,
        }
    }
}

/// Selection and placement settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of ad slots (default: 1).
    pub slots: usize,

    /// Daily impressions per ad before it is deprioritized (default: 5).
    pub frequency_cap: u32,

    /// `shuffle` or `round_robin` (default: shuffle).
    pub selection: SelectionMode,

    /// Fixed RNG seed for reproducible shuffles.
    pub seed: Option<u64>,

    pub dismiss: DismissConfig,

    /// Visible fraction that counts as an impression (default: 0.5).
    pub visibility_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slots: 1,
            frequency_cap: DEFAULT_FREQUENCY_CAP,
            selection: SelectionMode::default(),
            seed: None,
            dismiss: DismissConfig::default(),
            visibility_threshold: DEFAULT_VISIBILITY_THRESHOLD,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slots == 0 {
            return Err(ConfigError::ValidationError(
                "engine slots must be positive".to_string(),
            ));
        }
        if self.frequency_cap == 0 {
            return Err(ConfigError::ValidationError(
                "engine frequency_cap must be positive".to_string(),
            ));
        }
        if !(self.visibility_threshold > 0.0 && self.visibility_threshold <= 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "engine visibility_threshold must be in (0, 1], got {}",
                self.visibility_threshold
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Batching
// =============================================================================

/// Event batching settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Flush cadence (default: "5s").
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,

    /// Repeated clicks on one ad within this window are ignored (default: "1500ms").
    #[serde(with = "humantime_serde")]
    pub click_debounce: Duration,

    /// Per-kind buffer size that flushes immediately (default: 500).
    pub max_batch: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            click_debounce: DEFAULT_CLICK_DEBOUNCE,
            max_batch: DEFAULT_MAX_BATCH,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch == 0 {
            return Err(ConfigError::ValidationError(
                "batch max_batch must be positive".to_string(),
            ));
        }
        if self.flush_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "batch flush_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Merge the engine and batch sections into runtime settings.
pub fn engine_settings(engine: &EngineConfig, batch: &BatchConfig) -> EngineSettings {
    EngineSettings {
        slots: engine.slots,
        frequency_cap: engine.frequency_cap,
        selection: engine.selection,
        seed: engine.seed,
        dismiss_enabled: engine.dismiss.enabled,
        dismiss_persist: engine.dismiss.persist,
        visibility_threshold: engine.visibility_threshold,
        click_debounce: batch.click_debounce,
        max_batch: batch.max_batch,
    }
}

// =============================================================================
// Daily reset
// =============================================================================

/// Daily impression reset check.
///
/// `cron` wins over `check_interval` when both are set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetConfig {
    /// How often to look for a day change (default: "1h").
    #[serde(with = "humantime_serde")]
    pub check_interval: Duration,

    /// 6-field cron expression, e.g. `"0 0 * * * *"`.
    pub cron: Option<String>,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_RESET_CHECK_INTERVAL,
            cron: None,
        }
    }
}

impl ResetConfig {
    /// The schedule this section describes.
    pub fn schedule(&self) -> Result<Schedule, ConfigError> {
        match &self.cron {
            Some(expr) => Schedule::cron(expr)
                .map_err(|e| ConfigError::ValidationError(format!("reset cron: {}", e))),
            None => Ok(Schedule::interval(self.check_interval)),
        }
    }
}
