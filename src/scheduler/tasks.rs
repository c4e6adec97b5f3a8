//! The engine's recurring jobs.

use std::time::Duration;

use crate::engine::Engine;
use crate::scheduler::{Schedule, Task, TaskError};

/// Default cadence of the daily-reset check (1 hour).
pub const DEFAULT_RESET_CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

fn ensure_open(engine: &Engine) -> Result<(), TaskError> {
    if engine.is_closed() {
        return Err(TaskError::Engine("engine is shut down".to_string()));
    }
    Ok(())
}

/// Re-renders every slot on the feed's rotation interval while the page is visible.
#[derive(Debug)]
pub struct RotationTask {
    engine: Engine,
    schedule: Schedule,
}

impl RotationTask {
    pub fn new(engine: Engine, every: Duration) -> Self {
        Self {
            engine,
            schedule: Schedule::interval(every),
        }
    }
}

#[async_trait::async_trait]
impl Task for RotationTask {
    fn name(&self) -> &str {
        "rotation"
    }

    fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    async fn run(&self) -> Result<(), TaskError> {
        ensure_open(&self.engine)?;
        self.engine.rotate().await;
        Ok(())
    }
}

/// Zeroes impression counters not yet reset today.
#[derive(Debug)]
pub struct DailyResetTask {
    engine: Engine,
    schedule: Schedule,
}

impl DailyResetTask {
    pub fn new(engine: Engine, schedule: Schedule) -> Self {
        Self { engine, schedule }
    }
}

#[async_trait::async_trait]
impl Task for DailyResetTask {
    fn name(&self) -> &str {
        "daily-reset"
    }

    fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    async fn run(&self) -> Result<(), TaskError> {
        ensure_open(&self.engine)?;
        self.engine.reset_daily().await;
        Ok(())
    }
}

/// Delivers pending events to the sink.
#[derive(Debug)]
pub struct FlushTask {
    engine: Engine,
    schedule: Schedule,
}

impl FlushTask {
    pub fn new(engine: Engine, every: Duration) -> Self {
        Self {
            engine,
            schedule: Schedule::interval(every),
        }
    }
}

#[async_trait::async_trait]
impl Task for FlushTask {
    fn name(&self) -> &str {
        "batch-flush"
    }

    fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    async fn run(&self) -> Result<(), TaskError> {
        ensure_open(&self.engine)?;
        self.engine.flush().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Placement;
    use crate::events::MemorySink;
    use crate::inventory::{AdRecord, LoadedFeed};
    use std::sync::Arc;

    async fn engine(sink: MemorySink) -> Engine {
        let engine = Engine::builder().sink(Arc::new(sink)).build().await;
        engine
            .set_inventory(LoadedFeed {
                ads: vec![
                    AdRecord::new("https://a.example", "A"),
                    AdRecord::new("https://b.example", "B"),
                ],
                rotation_interval: 10,
            })
            .await;
        engine
    }

    fn current(slots: &[Option<Placement>]) -> Placement {
        slots[0].clone().unwrap()
    }

    #[tokio::test]
    async fn test_rotation_task_skips_hidden_page() {
        let engine = engine(MemorySink::new()).await;
        let before = current(&engine.render_all().await);
        let task = RotationTask::new(engine.clone(), Duration::from_secs(10));

        engine.set_visibility(false).await;
        task.run().await.unwrap();
        assert_eq!(current(&engine.placements().await).id, before.id);

        engine.set_visibility(true).await;
        task.run().await.unwrap();
        assert_ne!(current(&engine.placements().await).id, before.id);
    }

    #[tokio::test]
    async fn test_flush_task_delivers_pending() {
        let sink = MemorySink::new();
        let engine = engine(sink.clone()).await;
        let placement = current(&engine.render_all().await);
        engine.activate(placement.id).await;

        let task = FlushTask::new(engine.clone(), Duration::from_secs(5));
        assert_eq!(task.schedule(), &Schedule::Interval(Duration::from_secs(5)));
        task.run().await.unwrap();
        assert_eq!(sink.calls(), 1);
    }

    #[tokio::test]
    async fn test_tasks_refuse_after_teardown() {
        let engine = engine(MemorySink::new()).await;
        engine.teardown().await;

        let task = DailyResetTask::new(engine, Schedule::interval(DEFAULT_RESET_CHECK_INTERVAL));
        assert!(matches!(task.run().await, Err(TaskError::Engine(_))));
    }
}
