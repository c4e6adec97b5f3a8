//! Scheduler Layer
//!
//! Recurring engine timers, each a [`Task`] registered as a job in a
//! [`TimerRegistry`]. Dropping or shutting down the registry cancels every job
//! it owns.
//!
//! - [`RotationTask`]: re-render every slot on the feed's rotation interval
//! - [`DailyResetTask`]: lazy daily impression reset
//! - [`FlushTask`]: periodic event batch delivery

mod registry;
mod tasks;
mod traits;

pub use registry::{DEFAULT_SHUTDOWN_TIMEOUT, JobInfo, TimerRegistry};
pub use tasks::{DEFAULT_RESET_CHECK_INTERVAL, DailyResetTask, FlushTask, RotationTask};
pub use traits::{MAX_INTERVAL, MIN_INTERVAL, Schedule, Task, TaskError};
