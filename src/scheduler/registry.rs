//! Timer registry for managing recurring engine jobs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::scheduler::{MAX_INTERVAL, MIN_INTERVAL, Schedule, Task, TaskError};

/// Default timeout for graceful shutdown (5 seconds).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Metadata about a registered job.
#[derive(Debug, Clone)]
pub struct JobInfo {
    /// Job UUID.
    pub id: uuid::Uuid,
    /// Task name.
    pub name: String,
    /// Schedule description.
    pub schedule: String,
}

/// Registry owning every recurring timer of one engine.
///
/// Uses `tokio-cron-scheduler` for job scheduling.
/// Supports both fixed-interval and cron-based scheduling.
pub struct TimerRegistry {
    scheduler: JobScheduler,
    jobs: Arc<RwLock<HashMap<uuid::Uuid, JobInfo>>>,
}

impl TimerRegistry {
    /// Create a new, stopped registry.
    pub async fn new() -> Result<Self, TaskError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| TaskError::Scheduler(e.to_string()))?;

        Ok(Self {
            scheduler,
            jobs: Arc::new(RwLock::new(HashMap::new())),
        })
    }
}

impl std::fmt::Debug for TimerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerRegistry")
            .field(
                "job_count",
                &self.jobs.try_read().map(|j| j.len()).unwrap_or(0),
            )
            .finish_non_exhaustive()
    }
}

impl TimerRegistry {
    /// Register a task as a recurring job.
    pub async fn spawn<T: Task>(&self, task: T) -> Result<uuid::Uuid, TaskError> {
        let name = task.name().to_string();
        let schedule_desc = task.schedule().to_string();

        let task = Arc::new(task);
        let job = Self::create_job(Arc::clone(&task), &name).inspect_err(
            |e| tracing::error!(task = %name, schedule = %schedule_desc, error = %e, "Job create failed"),
        )?;

        let job_id = self
            .scheduler
            .add(job)
            .await
            .map_err(|e| TaskError::Scheduler(e.to_string()))
            .inspect_err(|e| {
                tracing::error!(task = %name, schedule = %schedule_desc, error = %e, "Job register failed")
            })?;

        self.jobs.write().await.insert(
            job_id,
            JobInfo {
                id: job_id,
                name: name.clone(),
                schedule: schedule_desc.clone(),
            },
        );

        tracing::info!(task = %name, job_id = %job_id, schedule = %schedule_desc, "Timer registered");
        Ok(job_id)
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), TaskError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| TaskError::Scheduler(e.to_string()))?;
        tracing::info!(jobs = self.job_count().await, "Timer scheduler started");
        Ok(())
    }

    /// List all registered jobs.
    pub async fn list_jobs(&self) -> Vec<JobInfo> {
        self.jobs.read().await.values().cloned().collect()
    }

    /// Get the number of registered jobs.
    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Cancel every job, with the default timeout.
    pub async fn shutdown(self) -> Result<(), TaskError> {
        self.shutdown_with_timeout(DEFAULT_SHUTDOWN_TIMEOUT).await
    }

    /// Cancel every job, giving up after `timeout`.
    ///
    /// A timed-out shutdown is logged and reported as success; the scheduler
    /// is dropped either way.
    pub async fn shutdown_with_timeout(mut self, timeout: Duration) -> Result<(), TaskError> {
        let job_count = self.jobs.read().await.len();
        let result = tokio::time::timeout(timeout, async {
            self.scheduler
                .shutdown()
                .await
                .map_err(|e| TaskError::Scheduler(e.to_string()))
        })
        .await;

        match result {
            Ok(Ok(())) => {
                self.jobs.write().await.clear();
                tracing::info!(job_count, "Timer scheduler shutdown complete");
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::error!(job_count, error = %e, "Timer scheduler shutdown failed");
                Err(e)
            }
            Err(_) => {
                tracing::warn!(job_count, ?timeout, "Timer scheduler shutdown timed out");
                Ok(())
            }
        }
    }

    // --- Private helpers ---

    fn create_job<T: Task>(task: Arc<T>, name: &str) -> Result<Job, TaskError> {
        let name = name.to_owned();
        let schedule = task.schedule().clone();

        let make_callback = move || {
            let (task, name) = (Arc::clone(&task), name.clone());
            move |_: uuid::Uuid, _: JobScheduler| {
                let (task, name) = (Arc::clone(&task), name.clone());
                Box::pin(async move { run_task(task.as_ref(), &name).await })
                    as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
            }
        };

        match &schedule {
            Schedule::Interval(d) => {
                Job::new_repeated_async((*d).clamp(MIN_INTERVAL, MAX_INTERVAL), make_callback())
            }
            Schedule::Cron(expr) => Job::new_cron_job_async(expr, make_callback()),
        }
        .map_err(|e| TaskError::Scheduler(e.to_string()))
    }
}

/// Execute a single run and log the outcome.
async fn run_task<T: Task>(task: &T, name: &str) {
    let start = std::time::Instant::now();
    tracing::trace!(task = %name, "Running timer task");

    match task.run().await {
        Ok(()) => {
            tracing::trace!(task = %name, duration_ms = start.elapsed().as_millis(), "Timer task completed");
        }
        Err(e) => {
            tracing::error!(task = %name, error = %e, "Timer task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTask {
        name: String,
        schedule: Schedule,
        runs: Arc<AtomicUsize>,
    }

    impl CountingTask {
        fn new(name: &str, runs: Arc<AtomicUsize>) -> Self {
            Self {
                name: name.to_string(),
                schedule: Schedule::interval(Duration::from_secs(1)),
                runs,
            }
        }
    }

    #[async_trait::async_trait]
    impl Task for CountingTask {
        fn name(&self) -> &str {
            &self.name
        }

        fn schedule(&self) -> &Schedule {
            &self.schedule
        }

        async fn run(&self) -> Result<(), TaskError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_registry_lifecycle() {
        let registry = TimerRegistry::new().await.unwrap();
        let runs = Arc::new(AtomicUsize::new(0));

        let job_id = registry
            .spawn(CountingTask::new("counter", runs.clone()))
            .await
            .unwrap();
        assert_eq!(registry.job_count().await, 1);

        let jobs = registry.list_jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "counter");
        assert!(jobs[0].schedule.contains("1s"));

        assert_eq!(jobs[0].id, job_id);

        registry.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_raw_interval_registers() {
        let registry = TimerRegistry::new().await.unwrap();
        let task = CountingTask {
            name: "slow".to_string(),
            schedule: Schedule::Interval(Duration::from_secs(u64::MAX)),
            runs: Arc::new(AtomicUsize::new(0)),
        };
        registry.spawn(task).await.unwrap();
        registry.start().await.unwrap();
        assert_eq!(registry.job_count().await, 1);
        registry.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_interval_job_fires() {
        let registry = TimerRegistry::new().await.unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        registry
            .spawn(CountingTask::new("counter", runs.clone()))
            .await
            .unwrap();
        registry.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert!(runs.load(Ordering::SeqCst) >= 1);

        registry.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_cron_job_registers() {
        struct Hourly(Schedule);

        #[async_trait::async_trait]
        impl Task for Hourly {
            fn name(&self) -> &str {
                "hourly"
            }

            fn schedule(&self) -> &Schedule {
                &self.0
            }

            async fn run(&self) -> Result<(), TaskError> {
                Ok(())
            }
        }

        let registry = TimerRegistry::new().await.unwrap();
        registry
            .spawn(Hourly(Schedule::cron("0 0 * * * *").unwrap()))
            .await
            .unwrap();
        assert_eq!(registry.list_jobs().await[0].schedule, "cron: 0 0 * * * *");
        registry.shutdown().await.unwrap();
    }
}
