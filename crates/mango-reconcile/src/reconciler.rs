//! One reconciliation run: scan, deduplicate, refresh, write back.
//!
//! The flow of [`Reconciler::run_once`] is:
//!   1. Load every live session from the store (one full scan)
//!   2. Drop sessions without a token, then every session whose identity
//!      was already seen earlier in the scan
//!   3. For each remaining identity, fetch profile and guilds with that
//!      session's token, concurrently up to `max_concurrency`
//!   4. Write the fresh snapshots back to *every* session of that identity
//!   5. Purge records whose window has closed
//!   6. Log one completion event with the run's counters

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use futures_util::{FutureExt, StreamExt, stream};
use mango_session::{Session, SessionPatch, SessionStore, UserId};
use mango_upstream::IdentityClient;
use tracing::{debug, info, warn};

use crate::ReconcileReport;

/// How one identity's refresh ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Refreshed { sessions: usize },
    UpstreamFailed,
    StoreFailed,
}

/// Clears the in-flight flag when a run ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Refreshes cached snapshots for every live session.
///
/// Holds shared handles to the store and the upstream client, so one
/// reconciler can be driven by a [`ReconcileTask`](crate::ReconcileTask)
/// and called directly (e.g. from tests) at the same time. Runs never
/// overlap: a second caller is turned away while one is in flight.
pub struct Reconciler<S, C> {
    store: Arc<S>,
    client: Arc<C>,
    max_concurrency: usize,
    in_flight: AtomicBool,
}

impl<S, C> Reconciler<S, C>
where
    S: SessionStore,
    C: IdentityClient,
{
    /// Creates a reconciler with the default concurrency bound.
    pub fn new(store: Arc<S>, client: Arc<C>) -> Self {
        Self {
            store,
            client,
            max_concurrency: crate::ReconcileConfig::default().max_concurrency,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Creates a reconciler using `config.max_concurrency`.
    pub fn with_config(store: Arc<S>, client: Arc<C>, config: &crate::ReconcileConfig) -> Self {
        Self::new(store, client).with_max_concurrency(config.max_concurrency)
    }

    /// Bounds how many identities are refreshed at once (minimum 1).
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Whether a run is currently in progress.
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Performs one full reconciliation run.
    ///
    /// Returns `None`, without touching the store, if another run is
    /// already in flight. Never fails: every error is counted in the
    /// report and logged.
    pub async fn run_once(&self) -> Option<ReconcileReport> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("reconciliation already in flight — skipping");
            return None;
        }
        let _in_flight = InFlight(&self.in_flight);

        Some(self.reconcile().await)
    }

    async fn reconcile(&self) -> ReconcileReport {
        let started = Instant::now();
        let mut report = ReconcileReport::default();

        let sessions = match self.store.get_all().await {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(error = %e, "session scan failed — run abandoned");
                report.scan_failed = true;
                report.elapsed = started.elapsed();
                log_completion(&report);
                return report;
            }
        };
        report.scanned = sessions.len();

        // Enumeration order decides which duplicate's token is used.
        let mut seen: HashSet<UserId> = HashSet::new();
        let mut work = Vec::new();
        for session in sessions {
            if !session.is_usable() {
                report.skipped_anonymous += 1;
                continue;
            }
            if !seen.insert(session.identity().clone()) {
                report.skipped_duplicate += 1;
                continue;
            }
            let Session {
                user, access_token, ..
            } = session;
            work.push((user.id, access_token));
        }

        let outcomes: Vec<Outcome> = stream::iter(work)
            .map(|(identity, token)| self.refresh_guarded(identity, token))
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Outcome::Refreshed { sessions } => {
                    report.refreshed += 1;
                    report.sessions_updated += sessions;
                }
                Outcome::UpstreamFailed => report.upstream_failed += 1,
                Outcome::StoreFailed => report.store_failed += 1,
            }
        }

        match self.store.purge_expired().await {
            Ok(purged) => report.purged = purged,
            Err(e) => warn!(error = %e, "expired session purge failed"),
        }
        report.elapsed = started.elapsed();

        log_completion(&report);
        report
    }

    /// [`refresh`](Self::refresh) with panics contained to this identity.
    async fn refresh_guarded(&self, identity: UserId, token: String) -> Outcome {
        match AssertUnwindSafe(self.refresh(&identity, &token))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(user_id = %identity, "refresh panicked — cached snapshot kept");
                Outcome::UpstreamFailed
            }
        }
    }

    async fn refresh(&self, identity: &UserId, token: &str) -> Outcome {
        let fetched = tokio::try_join!(
            self.client.fetch_profile(token),
            self.client.fetch_guilds(token),
        );
        let (user, guilds) = match fetched {
            Ok(snapshots) => snapshots,
            Err(e) if e.is_auth_rejection() => {
                info!(
                    user_id = %identity,
                    error = %e,
                    "access token rejected — cached snapshot kept"
                );
                return Outcome::UpstreamFailed;
            }
            Err(e) => {
                warn!(
                    user_id = %identity,
                    error = %e,
                    "upstream refresh failed — cached snapshot kept"
                );
                return Outcome::UpstreamFailed;
            }
        };

        match self
            .store
            .upsert_by_identity(identity, SessionPatch::snapshots(user, guilds))
            .await
        {
            Ok(sessions) => {
                debug!(user_id = %identity, sessions, "cached snapshot refreshed");
                Outcome::Refreshed { sessions }
            }
            Err(e) => {
                warn!(user_id = %identity, error = %e, "snapshot write-back failed");
                Outcome::StoreFailed
            }
        }
    }
}

/// The one completion event every run emits.
fn log_completion(report: &ReconcileReport) {
    info!(
        scanned = report.scanned,
        identities = report.identities(),
        refreshed = report.refreshed,
        sessions_updated = report.sessions_updated,
        skipped_anonymous = report.skipped_anonymous,
        skipped_duplicate = report.skipped_duplicate,
        upstream_failed = report.upstream_failed,
        store_failed = report.store_failed,
        purged = report.purged,
        scan_failed = report.scan_failed,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "session cache refreshed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use mango_session::{MemorySessionStore, UserSnapshot};
    use mango_upstream::MockIdentityClient;

    #[tokio::test]
    async fn test_run_once_on_empty_store_reports_nothing() {
        let reconciler = Reconciler::new(
            Arc::new(MemorySessionStore::new()),
            Arc::new(MockIdentityClient::new()),
        );

        let report = reconciler.run_once().await.expect("not in flight");

        assert_eq!(report.scanned, 0);
        assert!(report.is_clean());
        assert!(!reconciler.is_running(), "flag cleared after the run");
    }

    #[test]
    fn test_with_max_concurrency_floors_at_one() {
        let reconciler = Reconciler::new(
            Arc::new(MemorySessionStore::new()),
            Arc::new(MockIdentityClient::new().with_user(
                "t",
                UserSnapshot::new("u", "n"),
                vec![],
            )),
        )
        .with_max_concurrency(0);

        assert_eq!(reconciler.max_concurrency, 1);
    }
}
