//! JSON-file session store.
//!
//! Same map as [`MemorySessionStore`](crate::MemorySessionStore), persisted
//! to disk after every write so dashboard logins survive a restart. The file
//! is replaced atomically: the new contents go to `<path>.tmp`, which is then
//! renamed over the old file.
//!
//! The write lock is held while the file is written, so the on-disk order of
//! writes always matches the in-memory order. Each write is staged on a copy
//! of the map, and the copy only replaces the live map once it is on disk: a
//! failed write leaves the store exactly as it was.

use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use crate::memory::{SessionMap, live_all, live_get, patch_identity, purge};
use crate::{Session, SessionId, SessionPatch, SessionStore, StoreError, UserId};

/// Session store backed by a single JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    sessions: RwLock<SessionMap>,
}

impl JsonFileStore {
    /// Opens the store at `path`, loading any sessions already there.
    ///
    /// A missing file is an empty store; it is created on the first write.
    ///
    /// # Errors
    /// - [`StoreError::Io`] if the file exists but can't be read
    /// - [`StoreError::Corrupt`] if it doesn't decode as a session list
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let sessions = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let list: Vec<Session> =
                    serde_json::from_slice(&bytes).map_err(StoreError::Corrupt)?;
                list.into_iter().map(|s| (s.id.clone(), s)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SessionMap::new(),
            Err(e) => return Err(StoreError::Io(e)),
        };

        tracing::info!(path = %path.display(), sessions = sessions.len(), "session file opened");

        Ok(Self {
            path,
            sessions: RwLock::new(sessions),
        })
    }

    async fn persist(&self, map: &SessionMap) -> Result<(), StoreError> {
        let list: Vec<&Session> = map.values().collect();
        let bytes = serde_json::to_vec_pretty(&list).map_err(StoreError::Serialize)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

impl SessionStore for JsonFileStore {
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        Ok(live_get(&*self.sessions.read().await, id))
    }

    async fn insert(&self, session: Session) -> Result<(), StoreError> {
        let mut map = self.sessions.write().await;
        let mut staged = map.clone();
        staged.insert(session.id.clone(), session);
        self.persist(&staged).await?;
        *map = staged;
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
        let mut map = self.sessions.write().await;
        let mut staged = map.clone();
        let updated = patch_identity(&mut staged, identity, &patch);
        if updated > 0 {
            self.persist(&staged).await?;
            *map = staged;
        }
        Ok(updated)
    }

    async fn delete_by_id(&self, id: &SessionId) -> Result<bool, StoreError> {
        let mut map = self.sessions.write().await;
        if !map.contains_key(id) {
            return Ok(false);
        }
        let mut staged = map.clone();
        staged.remove(id);
        self.persist(&staged).await?;
        *map = staged;
        Ok(true)
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let mut map = self.sessions.write().await;
        let mut staged = map.clone();
        let purged = purge(&mut staged);
        if purged > 0 {
            self.persist(&staged).await?;
            *map = staged;
        }
        Ok(purged)
    }
}
