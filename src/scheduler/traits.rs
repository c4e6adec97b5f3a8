//! Core task traits and types.

use std::time::Duration;

use thiserror::Error;

/// Minimum allowed interval (1 second).
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Maximum allowed interval (7 days).
pub const MAX_INTERVAL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Errors that can occur while scheduling or running a timer task.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The engine refused the work (e.g. already shut down).
    #[error("engine error: {0}")]
    Engine(String),

    /// Scheduler error.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
}

/// Schedule for task execution.
///
/// Supports both fixed interval and cron-based scheduling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// Fixed interval between runs.
    ///
    /// Registered jobs clamp it to `MIN_INTERVAL..=MAX_INTERVAL`.
    Interval(Duration),

    /// Cron expression for scheduled execution.
    ///
    /// Uses `sec min hour day month weekday` (6-field).
    /// Example: `"0 0 * * * *"` = at the top of every hour
    Cron(String),
}

impl Schedule {
    /// Create an interval schedule.
    ///
    /// Interval is clamped to `MIN_INTERVAL..=MAX_INTERVAL`.
    pub fn interval(duration: Duration) -> Self {
        if duration < MIN_INTERVAL {
            tracing::warn!(min_interval = ?MIN_INTERVAL, requested = ?duration,
                "Interval duration is less than minimum allowed. Using minimum duration."
            );
            Self::Interval(MIN_INTERVAL)
        } else if duration > MAX_INTERVAL {
            tracing::warn!(max_interval = ?MAX_INTERVAL, requested = ?duration,
                "Interval duration exceeds maximum allowed. Using maximum duration."
            );
            Self::Interval(MAX_INTERVAL)
        } else {
            Self::Interval(duration)
        }
    }

    /// Create a cron schedule with immediate validation.
    ///
    /// # Errors
    /// Returns `TaskError::Config` if the cron expression is invalid.
    pub fn cron(expr: impl AsRef<str>) -> Result<Self, TaskError> {
        use std::str::FromStr;

        let expr = expr.as_ref();
        cron::Schedule::from_str(expr)
            .map_err(|e| TaskError::Config(format!("invalid cron expression: {e}")))?;

        Ok(Self::Cron(expr.to_string()))
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interval(d) => write!(f, "every {:?}", d),
            Self::Cron(expr) => write!(f, "cron: {}", expr),
        }
    }
}

/// A recurring unit of engine work driven by the [`TimerRegistry`](super::TimerRegistry).
///
/// A run that decides to do nothing (page hidden, nothing pending) returns
/// `Ok(())`. `Err` is reserved for the task being unable to run at all.
#[async_trait::async_trait]
pub trait Task: Send + Sync + 'static {
    /// Unique job name (e.g. `"rotation"`).
    fn name(&self) -> &str;

    /// Execution schedule (interval or cron).
    fn schedule(&self) -> &Schedule;

    /// Perform one run.
    async fn run(&self) -> Result<(), TaskError>;
}
