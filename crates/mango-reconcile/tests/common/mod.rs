//! Shared fixtures for the reconciliation tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

use mango_session::{
    GuildSnapshot, MemorySessionStore, Session, SessionId, SessionPatch, SessionStore, StoreError,
    UserId, UserSnapshot,
};
use time::OffsetDateTime;

/// A stored session for `user` holding `token`.
pub fn session(id: &str, user: &str, token: &str) -> Session {
    Session {
        id: SessionId::new(id),
        access_token: token.to_string(),
        refresh_token: format!("refresh-{id}"),
        expires_at: OffsetDateTime::now_utc() + time::Duration::days(7),
        user: UserSnapshot::new(user, "cached"),
        guilds: vec![GuildSnapshot::new("g-old", "Old Guild")],
    }
}

/// What the upstream returns for a user after a profile change.
pub fn fresh_user(user: &str) -> UserSnapshot {
    UserSnapshot::new(user, "fresh")
}

pub fn fresh_guilds() -> Vec<GuildSnapshot> {
    vec![
        GuildSnapshot::new("g1", "Guild One"),
        GuildSnapshot::new("g2", "Guild Two"),
    ]
}

/// Memory store whose scan or per-identity writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemorySessionStore,
    fail_scan: AtomicBool,
    fail_writes: Mutex<HashSet<UserId>>,
}

impl FlakyStore {
    pub fn with_sessions(sessions: impl IntoIterator<Item = Session>) -> Self {
        Self {
            inner: MemorySessionStore::with_sessions(sessions),
            ..Default::default()
        }
    }

    pub fn fail_scan(&self) {
        self.fail_scan.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes_for(&self, user: &str) {
        self.fail_writes.lock().unwrap().insert(UserId::new(user));
    }
}

fn io_error() -> StoreError {
    StoreError::Io(std::io::Error::other("scripted store failure"))
}

impl SessionStore for FlakyStore {
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        self.inner.get(id).await
    }

    async fn insert(&self, session: Session) -> Result<(), StoreError> {
        self.inner.insert(session).await
    }

    async fn get_all(&self) -> Result<Vec<Session>, StoreError> {
        if self.fail_scan.load(Ordering::SeqCst) {
            return Err(io_error());
        }
        self.inner.get_all().await
    }

    async fn upsert_by_identity(
        &self,
        identity: &UserId,
        patch: SessionPatch,
    ) -> Result<usize, StoreError> {
        let fail = self.fail_writes.lock().unwrap().contains(identity);
        if fail {
            return Err(io_error());
        }
        self.inner.upsert_by_identity(identity, patch).await
    }

    async fn delete_by_id(&self, id: &SessionId) -> Result<bool, StoreError> {
        self.inner.delete_by_id(id).await
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        self.inner.purge_expired().await
    }
}

/// Collects formatted log lines written while the guard from
/// [`LogCapture::install`] is alive on this thread.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Number of captured lines containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.count(needle) > 0
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
