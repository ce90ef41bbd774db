//! Background ticker driving the schedule runner
//!
//! The task calls [`ScheduleRunner::tick`] once per `tick_interval` until
//! `shutdown()` is called. Ticks that fall behind are delayed rather than
//! bursted, and a failed tick is logged without stopping the loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::error::{Result, SchedulerError};
use crate::runner::ScheduleRunner;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the periodic scheduler loop
#[derive(Debug)]
pub struct SchedulerTask {
    background_task: Option<JoinHandle<()>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    tick_count: Arc<AtomicU64>,
}

impl SchedulerTask {
    /// Spawn the loop; the first tick runs immediately
    pub fn start(runner: Arc<ScheduleRunner>) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let tick_count = Arc::new(AtomicU64::new(0));

        let background_task = tokio::spawn(Self::tick_loop(
            runner,
            Arc::clone(&tick_count),
            shutdown_rx,
        ));

        Self {
            background_task: Some(background_task),
            shutdown_tx: Some(shutdown_tx),
            tick_count,
        }
    }

    /// Number of completed ticks
    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.background_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop the loop, waiting up to five seconds for an in-flight tick
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(()).await;
        }

        let Some(task) = self.background_task.take() else {
            return Ok(());
        };

        match timeout(SHUTDOWN_TIMEOUT, task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SchedulerError::ShutdownError(format!(
                "Scheduler task panicked: {e}"
            ))),
            Err(_) => Err(SchedulerError::ShutdownError(format!(
                "Scheduler task shutdown timed out after {:?}",
                SHUTDOWN_TIMEOUT
            ))),
        }
    }

    async fn tick_loop(
        runner: Arc<ScheduleRunner>,
        tick_count: Arc<AtomicU64>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut ticker = interval(runner.config().tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Scheduler started (tick interval {:?})",
            runner.config().tick_interval
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = runner.tick(Utc::now()).await {
                        tracing::error!("Scheduler tick failed: {}", e);
                    }
                    tick_count.fetch_add(1, Ordering::Relaxed);
                }
                _ = shutdown_rx.recv() => {
                    break;
                }
            }
        }

        tracing::info!("Scheduler stopped");
    }
}

impl Drop for SchedulerTask {
    fn drop(&mut self) {
        if let Some(task) = self.background_task.take() {
            task.abort();
        }
    }
}
