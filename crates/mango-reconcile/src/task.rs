//! Background task driving a [`Reconciler`] on a fixed interval.
//!
//! The task sits in a `tokio::select!` loop:
//!
//! ```text
//! loop {
//!     select! {
//!         shutdown        => break,
//!         interval.tick() => run,
//!         trigger.recv()  => run,
//!     }
//! }
//! ```
//!
//! A run is never started while another is in progress: the loop awaits
//! each run before selecting again. Manual triggers go through a
//! single-slot channel, so any number of `trigger()` calls made during a
//! run collapse into one follow-up run.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use mango_session::SessionStore;
use mango_upstream::IdentityClient;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::{ReconcileConfig, Reconciler};

/// Owned handle to the running reconciliation task.
///
/// Dropping the handle also stops the task, but without waiting for the
/// current run; prefer [`stop`](Self::stop).
pub struct ReconcileTask {
    trigger: mpsc::Sender<()>,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
    runs: Arc<AtomicU64>,
}

impl ReconcileTask {
    /// Spawns the task. The first run happens one full interval from now.
    ///
    /// Only `interval` and `missed_tick` are read from `config`; the
    /// concurrency bound belongs to the reconciler (see
    /// [`Reconciler::with_config`]).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<S, C>(reconciler: Arc<Reconciler<S, C>>, config: ReconcileConfig) -> Self
    where
        S: SessionStore,
        C: IdentityClient,
    {
        let config = config.validated();
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let runs = Arc::new(AtomicU64::new(0));

        let join = tokio::spawn(drive(
            reconciler,
            config,
            trigger_rx,
            shutdown_rx,
            Arc::clone(&runs),
        ));

        Self {
            trigger: trigger_tx,
            shutdown: Some(shutdown_tx),
            join: Some(join),
            runs,
        }
    }

    /// Requests a run as soon as the current one (if any) finishes.
    ///
    /// Returns `false` if a request is already pending, in which case this
    /// one is folded into it.
    pub fn trigger(&self) -> bool {
        self.trigger.try_send(()).is_ok()
    }

    /// Number of runs completed since the task started.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Acquire)
    }

    /// Whether the task is still alive.
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// Stops the task, waiting for an in-progress run to finish first.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                warn!(error = %e, "reconciliation task ended abnormally");
            }
        }
    }
}

async fn drive<S, C>(
    reconciler: Arc<Reconciler<S, C>>,
    config: ReconcileConfig,
    mut trigger: mpsc::Receiver<()>,
    mut shutdown: oneshot::Receiver<()>,
    runs: Arc<AtomicU64>,
) where
    S: SessionStore,
    C: IdentityClient,
{
    let mut interval = time::interval_at(Instant::now() + config.interval, config.interval);
    interval.set_missed_tick_behavior(config.missed_tick.into());

    info!(
        interval_secs = config.interval.as_secs_f64(),
        missed_tick = ?config.missed_tick,
        "reconciliation task started"
    );

    loop {
        // `biased` checks shutdown first so a pending stop always wins
        // over a tick that became ready at the same time.
        tokio::select! {
            biased;
            // Fires on `stop()` and when the handle is dropped.
            _ = &mut shutdown => break,
            _ = interval.tick() => trace_reason("interval"),
            Some(()) = trigger.recv() => trace_reason("trigger"),
        }

        if reconciler.run_once().await.is_some() {
            runs.fetch_add(1, Ordering::AcqRel);
        }
    }

    info!(runs = runs.load(Ordering::Acquire), "reconciliation task stopped");
}

fn trace_reason(reason: &'static str) {
    debug!(reason, "reconciliation run starting");
}
