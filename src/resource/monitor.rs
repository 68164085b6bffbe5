//! Periodic memory-pressure monitor.
//!
//! The monitor is an explicit handle around a tokio task. Each tick calls
//! [`ResourceManager::run_eviction_cycle`]; tests can call that directly
//! to single-step instead of waiting on the timer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::resource::manager::ResourceManager;

/// Starts memory monitors.
pub struct MemoryMonitor;

impl MemoryMonitor {
    /// Start a monitor using the manager's configured interval.
    pub fn start(manager: Arc<ResourceManager>) -> Result<MonitorHandle> {
        let interval = manager.config().monitor_interval();
        Self::start_with_interval(manager, interval)
    }

    /// Start a monitor that ticks every `period`. The first tick happens
    /// one period after start.
    pub fn start_with_interval(
        manager: Arc<ResourceManager>,
        period: Duration,
    ) -> Result<MonitorHandle> {
        if period.is_zero() {
            return Err(Error::Config("monitor interval must be > 0".into()));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Internal(format!("Cannot start memory monitor: {}", e)))?;

        let cancel = CancellationToken::new();
        let ticks = Arc::new(AtomicU64::new(0));

        let task_cancel = cancel.clone();
        let task_ticks = ticks.clone();
        let task = runtime.spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let suspended = manager.run_eviction_cycle();
                        task_ticks.fetch_add(1, Ordering::SeqCst);
                        debug!(suspended = suspended.len(), "memory monitor tick");
                    }
                    _ = task_cancel.cancelled() => {
                        info!("memory monitor shutting down");
                        break;
                    }
                }
            }
        });

        info!(interval_ms = period.as_millis() as u64, "memory monitor started");

        Ok(MonitorHandle {
            cancel,
            ticks,
            task: Some(task),
        })
    }
}

/// Handle to a running monitor. Dropping it stops the monitor.
pub struct MonitorHandle {
    cancel: CancellationToken,
    ticks: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Request the monitor to stop after its current tick.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
            && self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Stop the monitor and wait for its task to exit.
    pub async fn shutdown(mut self) -> Result<()> {
        self.cancel.cancel();
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| Error::Internal(format!("Memory monitor task failed: {}", e))),
            None => Ok(()),
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::hardware::StaticProbe;
    use crate::resource::config::ResourceConfig;
    use crate::resource::telemetry::FixedTelemetry;

    fn pressured_manager(clock: &ManualClock) -> Arc<ResourceManager> {
        let manager = ResourceManager::with_parts(
            ResourceConfig {
                monitor_interval_ms: 1_000,
                ..Default::default()
            },
            Arc::new(FixedTelemetry::new(1000, 900)),
            Arc::new(StaticProbe::default()),
            Arc::new(clock.clone()),
        )
        .unwrap();

        for id in ["a", "b", "c", "d", "e"] {
            manager.create_tab_process(id, "https://x.test").unwrap();
            clock.advance_ms(1_000);
        }
        Arc::new(manager)
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_evicts_on_tick() {
        let clock = ManualClock::starting_now();
        let manager = pressured_manager(&clock);
        let handle = MemoryMonitor::start(manager.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(1_500)).await;

        assert_eq!(handle.ticks(), 1);
        assert_eq!(manager.get_memory_usage().suspended_tab_count, 3);
        assert!(manager.get_tab("a").unwrap().suspended);
        assert!(!manager.get_tab("e").unwrap().suspended);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_monitor_does_not_tick() {
        let clock = ManualClock::starting_now();
        let manager = pressured_manager(&clock);
        let handle = MemoryMonitor::start(manager.clone()).unwrap();

        handle.stop();
        assert!(!handle.is_running());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(handle.ticks(), 0);
        assert_eq!(manager.get_memory_usage().suspended_tab_count, 0);
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let clock = ManualClock::starting_now();
        let manager = pressured_manager(&clock);
        let result = MemoryMonitor::start_with_interval(manager, Duration::ZERO);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
