//! Poll scheduler.
//!
//! Runs one cycle immediately, then one per interval until shutdown.
//! Each cycle is awaited before the next tick is considered and missed
//! ticks are skipped, so cycles never overlap. State transitions are
//! broadcast on a `watch` channel.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{info, warn};

use super::orchestrator::{CycleReport, FetchOrchestrator};

/// Scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running { cycle: u64 },
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "idle"),
            SchedulerState::Running { cycle } => write!(f, "running (cycle {cycle})"),
            SchedulerState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Drives the orchestrator on a fixed interval.
pub struct Scheduler {
    orchestrator: Arc<FetchOrchestrator>,
    interval: Duration,
    state: watch::Sender<SchedulerState>,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<FetchOrchestrator>, interval: Duration) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            orchestrator,
            interval,
            state,
        }
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Run until `shutdown` flips to `true` (or its sender is dropped).
    ///
    /// A cycle in flight when shutdown arrives is abandoned: its provider
    /// tasks are aborted and partially written snapshots are left for the
    /// TTL to clean up. Returns the number of completed cycles.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut completed = 0u64;

        info!(
            interval_secs = self.interval.as_secs(),
            providers = ?self.orchestrator.provider_names(),
            "Scheduler started"
        );

        // First cycle runs before any waiting.
        if !*shutdown.borrow() {
            match self.run_cycle(completed + 1, &mut shutdown).await {
                Some(_) => completed += 1,
                None => return self.stop(completed),
            }
        }

        // The interval is measured from the end of the first cycle.
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_cycle(completed + 1, &mut shutdown).await {
                        Some(_) => completed += 1,
                        None => break,
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.stop(completed)
    }

    /// Run one cycle, racing it against shutdown. `None` if abandoned.
    async fn run_cycle(
        &self,
        cycle: u64,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Option<CycleReport> {
        self.state.send_replace(SchedulerState::Running { cycle });

        let result = tokio::select! {
            report = self.orchestrator.run_cycle(cycle) => Some(report),
            _ = wait_for_shutdown(shutdown) => {
                warn!(cycle, "Shutdown during cycle, abandoning in-flight fetches");
                None
            }
        };

        if result.is_some() {
            self.state.send_replace(SchedulerState::Idle);
        }
        result
    }

    fn stop(&self, completed: u64) -> u64 {
        self.state.send_replace(SchedulerState::Stopped);
        info!(cycles = completed, "Scheduler stopped");
        completed
    }
}

/// Resolve once shutdown is explicitly requested. A dropped sender never
/// interrupts a cycle; the main loop notices it between cycles.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
