//! SweepScheduler - Background service for the reconciliation sweep.
//!
//! Webhooks drive subscription lifecycles in real time; the sweep is the
//! safety net behind them. This service runs the sweep on a fixed interval:
//!
//! 1. Handlers mutate subscriptions as events arrive
//! 2. **SweepScheduler periodically reconciles what events missed** ← This module
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 24h | How often to run the sweep |
//! | `run_on_startup` | true | Sweep immediately at boot to catch up after downtime |
//!
//! ## Graceful Shutdown
//!
//! The service listens for a shutdown signal and exits without starting
//! another sweep. A sweep already in flight finishes on its own task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::application::handlers::billing::{
    ReconciliationReport, RunReconciliationCommand, RunReconciliationHandler,
    RunReconciliationResult,
};
use crate::domain::foundation::Timestamp;

/// Configuration for the SweepScheduler service.
#[derive(Debug, Clone)]
pub struct SweepSchedulerConfig {
    /// How often to run the sweep.
    pub interval: Duration,

    /// Whether to sweep immediately at startup.
    pub run_on_startup: bool,
}

impl Default for SweepSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 60 * 60),
            run_on_startup: true,
        }
    }
}

impl SweepSchedulerConfig {
    /// Create config with a custom sweep interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Create config with startup sweeping toggled.
    pub fn with_run_on_startup(mut self, run_on_startup: bool) -> Self {
        self.run_on_startup = run_on_startup;
        self
    }
}

/// Background service that runs the reconciliation sweep on a schedule.
pub struct SweepScheduler {
    handler: Arc<RunReconciliationHandler>,
    config: SweepSchedulerConfig,
}

impl SweepScheduler {
    /// Create a new SweepScheduler with default configuration.
    pub fn new(handler: Arc<RunReconciliationHandler>) -> Self {
        Self {
            handler,
            config: SweepSchedulerConfig::default(),
        }
    }

    /// Create a new SweepScheduler with custom configuration.
    pub fn with_config(handler: Arc<RunReconciliationHandler>, config: SweepSchedulerConfig) -> Self {
        Self { handler, config }
    }

    /// Run the scheduler loop until shutdown signal is received.
    ///
    /// # Arguments
    ///
    /// * `shutdown` - Watch channel that signals when to stop
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);
        // After a pause (suspend, clock jump) one catch-up sweep is enough
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if !self.config.run_on_startup {
            // The first interval tick fires immediately; swallow it so the
            // first sweep lands a full interval after boot
            interval.tick().await;
        }

        loop {
            tokio::select! {
                // Check for shutdown signal
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Sweep scheduler stopping");
                        return;
                    }
                }

                // Sweep interval elapsed
                _ = interval.tick() => {
                    self.sweep_once().await;
                }
            }
        }
    }

    /// Run exactly one sweep.
    ///
    /// Failures are logged, never propagated; the next tick retries. This
    /// method is also useful for testing without running the full loop.
    pub async fn sweep_once(&self) -> Option<ReconciliationReport> {
        let cmd = RunReconciliationCommand {
            now: Timestamp::now(),
        };

        match self.handler.handle(cmd).await {
            Ok(RunReconciliationResult::Completed(report)) => Some(report),
            Ok(RunReconciliationResult::AlreadyRunning) => {
                tracing::warn!("Previous reconciliation sweep still running; tick skipped");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "Reconciliation sweep failed");
                None
            }
        }
    }
}
