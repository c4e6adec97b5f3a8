//! Engine plus its timers, started and stopped as one unit.

use std::time::Duration;

use crate::engine::Engine;
use crate::events::DEFAULT_FLUSH_INTERVAL;
use crate::scheduler::{
    DEFAULT_RESET_CHECK_INTERVAL, DailyResetTask, FlushTask, JobInfo, RotationTask, Schedule,
    TaskError, TimerRegistry,
};

/// Timer cadences for [`EngineService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSettings {
    pub flush_interval: Duration,
    /// Daily-reset check schedule.
    pub reset: Schedule,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            reset: Schedule::Interval(DEFAULT_RESET_CHECK_INTERVAL),
        }
    }
}

/// A running engine and every timer it owns.
#[derive(Debug)]
pub struct EngineService {
    engine: Engine,
    registry: TimerRegistry,
}

impl EngineService {
    /// Register the rotation (if the feed asked for one), daily-reset, and
    /// flush timers, then start them.
    pub async fn start(engine: Engine, timers: &TimerSettings) -> Result<Self, TaskError> {
        let registry = TimerRegistry::new().await?;

        let rotation = engine.rotation_interval().await;
        if rotation > 0 {
            registry
                .spawn(RotationTask::new(engine.clone(), Duration::from_secs(rotation)))
                .await?;
        } else {
            tracing::info!("Feed requested no rotation");
        }
        registry
            .spawn(DailyResetTask::new(engine.clone(), timers.reset.clone()))
            .await?;
        registry
            .spawn(FlushTask::new(engine.clone(), timers.flush_interval))
            .await?;
        registry.start().await?;

        Ok(Self { engine, registry })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub async fn jobs(&self) -> Vec<JobInfo> {
        self.registry.list_jobs().await
    }

    /// Cancel every timer, then tear the engine down (final flush, unmount).
    pub async fn shutdown(self) {
        if let Err(e) = self.registry.shutdown().await {
            tracing::warn!(error = %e, "Timer shutdown failed");
        }
        self.engine.teardown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use crate::inventory::{AdRecord, LoadedFeed};
    use std::sync::Arc;

    async fn engine(rotation_interval: u64, sink: MemorySink) -> Engine {
        let engine = Engine::builder().sink(Arc::new(sink)).build().await;
        engine
            .set_inventory(LoadedFeed {
                ads: vec![AdRecord::new("https://a.example", "A")],
                rotation_interval,
            })
            .await;
        engine
    }

    #[tokio::test]
    async fn test_no_rotation_job_for_zero_interval() {
        let service = EngineService::start(engine(0, MemorySink::new()).await, &TimerSettings::default())
            .await
            .unwrap();
        let mut names: Vec<_> = service.jobs().await.into_iter().map(|j| j.name).collect();
        names.sort();
        assert_eq!(names, vec!["batch-flush", "daily-reset"]);
        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_huge_rotation_interval_starts_cleanly() {
        let engine = Engine::builder().build().await;
        let feed = crate::inventory::parse_feed(
            r#"<ads rotation-interval="9223372036854775807"><ad><href>a</href></ad></ads>"#,
            &Default::default(),
        )
        .unwrap();
        assert_eq!(
            engine.set_inventory(feed).await,
            crate::inventory::MAX_ROTATION_INTERVAL
        );

        let service = EngineService::start(engine, &TimerSettings::default())
            .await
            .unwrap();
        assert_eq!(service.jobs().await.len(), 3);
        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_rotation_interval_clamped_when_set_directly() {
        let engine = engine(u64::MAX, MemorySink::new()).await;
        assert_eq!(
            engine.rotation_interval().await,
            crate::inventory::MAX_ROTATION_INTERVAL
        );
        let service = EngineService::start(engine, &TimerSettings::default())
            .await
            .unwrap();
        let jobs = service.jobs().await;
        assert!(jobs.iter().any(|j| j.name == "rotation" && j.schedule == "every 86400s"));
        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_cancels_and_tears_down() {
        let sink = MemorySink::new();
        let engine = engine(15, sink.clone()).await;
        let placement = engine.render_all().await[0].clone().unwrap();
        engine.activate(placement.id).await;

        let service = EngineService::start(engine.clone(), &TimerSettings::default())
            .await
            .unwrap();
        assert_eq!(service.jobs().await.len(), 3);

        service.shutdown().await;
        assert!(engine.is_closed());
        assert_eq!(sink.calls(), 1);
    }
}
