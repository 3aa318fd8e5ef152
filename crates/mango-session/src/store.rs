//! The storage seam for sessions.
//!
//! The HTTP layer and the reconciliation loop only ever talk to a
//! [`SessionStore`]. Swapping the in-memory store for the file-backed one
//! (or a database in the future) needs no change above this crate.

use std::future::Future;

use crate::{Session, SessionId, SessionPatch, StoreError, UserId};

/// Durable keyed table of sessions.
///
/// # Trait bounds
///
/// - `Send + Sync` → one store is shared by every request handler and the
///   background reconciliation task.
/// - `'static` → the store lives as long as the server.
///
/// # Consistency
///
/// Every write is atomic per record. Concurrent writes to the same record
/// are last-write-wins; writes never corrupt unrelated records. Records
/// whose `expires_at` has passed are invisible to `get` and `get_all`.
pub trait SessionStore: Send + Sync + 'static {
    /// Looks up a live session by identifier.
    fn get(
        &self,
        id: &SessionId,
    ) -> impl Future<Output = Result<Option<Session>, StoreError>> + Send;

    /// Inserts a session, replacing any record with the same identifier.
    fn insert(
        &self,
        session: Session,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Returns every live session, ordered by identifier.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Session>, StoreError>> + Send;

    /// Applies `patch` to every live session whose cached user id equals
    /// `identity`. Returns how many sessions were updated.
    fn upsert_by_identity(
        &self,
        identity: &UserId,
        patch: SessionPatch,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Deletes a session. Returns `true` if a record was removed.
    fn delete_by_id(
        &self,
        id: &SessionId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Drops every record whose window has closed. Returns how many.
    fn purge_expired(&self) -> impl Future<Output = Result<usize, StoreError>> + Send;
}
