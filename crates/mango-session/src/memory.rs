//! In-memory session store.
//!
//! Sessions live in a `BTreeMap` behind a Tokio `RwLock`. Reads (one
//! lookup per request, one full scan per reconciliation run) share the
//! lock; writes take it exclusively for the duration of a single update, so
//! each write is atomic with respect to every other operation.

use std::collections::BTreeMap;

use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::{Session, SessionId, SessionPatch, SessionStore, StoreError, UserId};

/// Session map shared by the in-memory and file-backed stores.
pub(crate) type SessionMap = BTreeMap<SessionId, Session>;

/// Keeps sessions in process memory. Everything is lost on restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<SessionMap>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `sessions`.
    pub fn with_sessions(sessions: impl IntoIterator<Item = Session>) -> Self {
        let map = sessions.into_iter().map(|s| (s.id.clone(), s)).collect();
        Self {
            sessions: RwLock::new(map),
        }
    }

    /// Number of records held, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        Ok(live_get(&*self.sessions.read().await, id))
    }

    async fn insert(&self, session: Session) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session);
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Session>, StoreError> {
        Ok(live_all(&*self.sessions.read().await))
    }

    async fn upsert_by_identity(
        &self,
        identity: &UserId,
        patch: SessionPatch,
    ) -> Result<usize, StoreError> {
        Ok(patch_identity(
            &mut *self.sessions.write().await,
            identity,
            &patch,
        ))
    }

    async fn delete_by_id(&self, id: &SessionId) -> Result<bool, StoreError> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        Ok(purge(&mut *self.sessions.write().await))
    }
}

// ---------------------------------------------------------------------------
// Map operations shared with `JsonFileStore`
// ---------------------------------------------------------------------------

pub(crate) fn live_get(map: &SessionMap, id: &SessionId) -> Option<Session> {
    let now = OffsetDateTime::now_utc();
    map.get(id).filter(|s| !s.is_expired_at(now)).cloned()
}

pub(crate) fn live_all(map: &SessionMap) -> Vec<Session> {
    let now = OffsetDateTime::now_utc();
    map.values()
        .filter(|s| !s.is_expired_at(now))
        .cloned()
        .collect()
}

pub(crate) fn patch_identity(
    map: &mut SessionMap,
    identity: &UserId,
    patch: &SessionPatch,
) -> usize {
    let now = OffsetDateTime::now_utc();
    let mut updated = 0;
    for session in map.values_mut() {
        if session.identity() == identity && !session.is_expired_at(now) {
            session.apply(patch);
            updated += 1;
        }
    }
    updated
}

pub(crate) fn purge(map: &mut SessionMap) -> usize {
    let now = OffsetDateTime::now_utc();
    let before = map.len();
    map.retain(|_, s| !s.is_expired_at(now));
    let purged = before - map.len();
    if purged > 0 {
        tracing::info!(purged, "expired sessions purged");
    }
    purged
}
