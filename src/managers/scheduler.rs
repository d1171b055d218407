//! Fixed-delay scheduler driving the backup cycle
//!
//! The next cycle is armed only after the previous one has fully resolved, so at
//! most one cycle is ever in flight. A panic inside a cycle is caught and treated
//! as an unexpected error.

use crate::error::CycleError;
use crate::managers::backup::{BackupManager, CycleResult, DeliveryStatus};
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Delay used after an unexpected error instead of the configured interval
pub const FALLBACK_DELAY: Duration = Duration::from_secs(5 * 60);

/// Shortest delay ever used between two cycles
pub const MIN_DELAY: Duration = Duration::from_secs(60);

/// Whether a cycle is currently executing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Delay before the next cycle, given how the last one ended
pub fn next_delay(result: &CycleResult, interval: Duration) -> Duration {
    match result {
        Err(e) if e.is_unexpected() => FALLBACK_DELAY,
        _ => interval.max(MIN_DELAY),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "cycle panicked".to_string()
    }
}

pub struct Scheduler {
    manager: BackupManager,
    state: SchedulerState,
    cycles_run: u64,
}

impl Scheduler {
    pub fn new(manager: BackupManager) -> Self {
        Self {
            manager,
            state: SchedulerState::Idle,
            cycles_run: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn cycles_run(&self) -> u64 {
        self.cycles_run
    }

    pub fn manager(&self) -> &BackupManager {
        &self.manager
    }

    /// Configured interval between cycles
    pub fn interval(&self) -> Duration {
        self.manager.context().config().backup.cycle_interval()
    }

    /// Run one cycle and return its result with the delay to wait before the next.
    ///
    /// `state` is `Running` for the duration of the cycle. Overlap is ruled out by
    /// the exclusive borrow: a second trigger cannot start until this one returns.
    pub async fn trigger(&mut self) -> (CycleResult, Duration) {
        self.state = SchedulerState::Running;
        let result = AssertUnwindSafe(self.manager.run_cycle())
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(CycleError::Unexpected(panic_message(payload))));
        self.state = SchedulerState::Idle;
        self.cycles_run += 1;

        self.report(&result).await;

        let delay = next_delay(&result, self.interval());
        let next_at = Utc::now()
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::minutes(5));
        info!(
            "Next backup cycle in {} minute(s), at {}",
            delay.as_secs() / 60,
            next_at.to_rfc3339()
        );

        (result, delay)
    }

    /// Run exactly `count` cycles, sleeping the computed delay between them
    pub async fn run_cycles(&mut self, count: usize) -> Vec<CycleResult> {
        let mut results = Vec::with_capacity(count);
        for i in 0..count {
            let (result, delay) = self.trigger().await;
            results.push(result);
            if i + 1 < count {
                sleep(delay).await;
            }
        }
        results
    }

    /// Run cycles until `shutdown` resolves. A running cycle is never interrupted;
    /// shutdown is only observed while waiting for the next one.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let (_, delay) = self.trigger().await;

            tokio::select! {
                _ = sleep(delay) => {}
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping scheduler after {} cycle(s)", self.cycles_run);
                    return;
                }
            }
        }
    }

    async fn report(&self, result: &CycleResult) {
        let audit = self.manager.audit();
        match result {
            Ok(outcome) => match outcome.delivery {
                DeliveryStatus::Failed(ref reason) => {
                    warn!("Backup kept on disk but not delivered: {}", reason)
                }
                _ => info!(
                    "Backup cycle completed: {}",
                    outcome.artifact.archive_path.display()
                ),
            },
            Err(CycleError::Unexpected(message)) => {
                error!("Unexpected error in backup cycle: {}", message);
                audit
                    .error(&format!("Unexpected error in backup routine: {}", message))
                    .await;
            }
            Err(e) => {
                error!("Backup cycle failed ({}): {}", e.kind(), e);
                audit
                    .error("Could not create the backup. Check the log for details.")
                    .await;
            }
        }
    }
}
