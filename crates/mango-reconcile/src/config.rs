//! Reconciliation configuration.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::warn;

/// What to do when a run takes longer than the interval.
///
/// Runs never overlap either way; this only decides when the next one
/// starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissedTick {
    /// Fire one overdue tick after a long run, drop the rest, and resume on
    /// the original cadence.
    #[default]
    Skip,
    /// Start the next interval from the moment the late run finished.
    Delay,
}

impl From<MissedTick> for MissedTickBehavior {
    fn from(policy: MissedTick) -> Self {
        match policy {
            MissedTick::Skip => MissedTickBehavior::Skip,
            MissedTick::Delay => MissedTickBehavior::Delay,
        }
    }
}

/// Full configuration for the reconciliation task.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Time between runs. Default: 60 seconds.
    pub interval: Duration,
    /// Maximum identities refreshed at once within a run. Default: 8.
    pub max_concurrency: usize,
    /// Missed-tick handling.
    pub missed_tick: MissedTick,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_concurrency: 8,
            missed_tick: MissedTick::default(),
        }
    }
}

impl ReconcileConfig {
    /// Shortest interval accepted.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

    /// A config with the given interval and defaults elsewhere.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Clamp any out-of-range values so the config is safe to use.
    ///
    /// Called by [`ReconcileTask::start`](crate::ReconcileTask::start). Rules:
    /// - `interval` raised to at least [`Self::MIN_INTERVAL`].
    /// - `max_concurrency` raised to at least 1.
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                "reconcile interval below minimum — clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        if self.max_concurrency == 0 {
            warn!("max_concurrency of 0 would stall every run — using 1");
            self.max_concurrency = 1;
        }
        self
    }
}
