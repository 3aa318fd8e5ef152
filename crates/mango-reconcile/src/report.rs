//! Counters describing one reconciliation run.

use std::time::Duration;

/// What a single run did.
///
/// Every stored session lands in exactly one of `skipped_anonymous`,
/// `skipped_duplicate`, or the identity that was refreshed for it, so
/// `scanned == skipped_anonymous + skipped_duplicate + identities()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Sessions returned by the full scan.
    pub scanned: usize,
    /// Sessions without an access token.
    pub skipped_anonymous: usize,
    /// Sessions whose identity was already handled earlier in the run.
    pub skipped_duplicate: usize,
    /// Identities whose fresh snapshots were written back.
    pub refreshed: usize,
    /// Identities whose profile or guild fetch failed (or panicked).
    pub upstream_failed: usize,
    /// Identities whose write-back failed.
    pub store_failed: usize,
    /// Session records rewritten by successful write-backs.
    pub sessions_updated: usize,
    /// Expired records dropped after the refresh pass.
    pub purged: usize,
    /// The full scan itself failed; nothing else was attempted.
    pub scan_failed: bool,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl ReconcileReport {
    /// Distinct identities attempted this run.
    pub fn identities(&self) -> usize {
        self.refreshed + self.upstream_failed + self.store_failed
    }

    /// `true` if every attempted identity was refreshed.
    pub fn is_clean(&self) -> bool {
        !self.scan_failed && self.upstream_failed == 0 && self.store_failed == 0
    }
}
