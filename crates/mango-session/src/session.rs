//! Session types: the record the server keeps for each logged-in browser.
//!
//! A session tracks:
//! - WHO is logged in (the cached [`UserSnapshot`])
//! - HOW we talk to the upstream on their behalf (access and refresh tokens)
//! - WHAT they can see (the cached [`GuildSnapshot`] list)
//! - WHEN the record stops being served (`expires_at`)

use std::fmt;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{GuildSnapshot, UserId, UserSnapshot};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session creation and the session cookie.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a new session stays valid. Default: 7 days.
    pub ttl: Duration,

    /// Name of the cookie carrying the session identifier.
    pub cookie_name: String,

    /// Whether the cookie is marked `Secure` (HTTPS only). Default: false.
    pub secure_cookie: bool,
}

impl SessionConfig {
    /// Seven days, the lifetime of a dashboard login.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Self::DEFAULT_TTL,
            cookie_name: "mango.sid".to_string(),
            secure_cookie: false,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Opaque session identifier handed to the browser in a signed cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random 32-character hex identifier (128 bits of entropy).
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::rng().random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single dashboard session.
///
/// Created after a successful authorization-code exchange. The store owns
/// the durable copy; everyone else works on clones for the length of one
/// operation and writes back through the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Assigned at creation, never changes.
    pub id: SessionId,

    /// Upstream credential. An empty string means the session is anonymous.
    #[serde(default)]
    pub access_token: String,

    /// Kept so an expired access token can be renewed upstream.
    #[serde(default)]
    pub refresh_token: String,

    /// End of the session's own validity window. Distinct from the upstream
    /// token's expiry and never touched by reconciliation.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Cached profile. Its `id` is the session's identity key.
    pub user: UserSnapshot,

    /// Cached guild memberships.
    #[serde(default)]
    pub guilds: Vec<GuildSnapshot>,
}

impl Session {
    /// Creates a fresh session with a random identifier, valid for `ttl`.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        user: UserSnapshot,
        guilds: Vec<GuildSnapshot>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: SessionId::generate(),
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: OffsetDateTime::now_utc() + ttl,
            user,
            guilds,
        }
    }

    /// The identity key used to deduplicate refresh work.
    pub fn identity(&self) -> &UserId {
        &self.user.id
    }

    /// See [`crate::is_usable`].
    pub fn is_usable(&self) -> bool {
        crate::is_usable(self)
    }

    /// Whether the session's validity window has closed at `now`.
    ///
    /// Only stores consult this; the usability policy does not.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }

    /// Applies a patch in place. `id` and `expires_at` are never patched.
    pub fn apply(&mut self, patch: &SessionPatch) {
        if let Some(user) = &patch.user {
            self.user = user.clone();
        }
        if let Some(guilds) = &patch.guilds {
            self.guilds = guilds.clone();
        }
        if let Some(token) = &patch.access_token {
            self.access_token = token.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// SessionPatch
// ---------------------------------------------------------------------------

/// A partial update applied to every session of one identity.
///
/// `None` leaves the corresponding field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub user: Option<UserSnapshot>,
    pub guilds: Option<Vec<GuildSnapshot>>,
    pub access_token: Option<String>,
}

impl SessionPatch {
    /// The patch reconciliation writes: fresh profile and guilds.
    pub fn snapshots(user: UserSnapshot, guilds: Vec<GuildSnapshot>) -> Self {
        Self {
            user: Some(user),
            guilds: Some(guilds),
            access_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(
            "t1",
            "r1",
            UserSnapshot::new("u1", "alice"),
            vec![GuildSnapshot::new("g1", "Guild One")],
            SessionConfig::DEFAULT_TTL,
        )
    }

    #[test]
    fn test_session_id_generate_is_32_hex_chars() {
        let id = SessionId::generate();

        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_session_id_generate_is_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn test_new_expires_seven_days_out() {
        let before = OffsetDateTime::now_utc();
        let s = session();
        let after = OffsetDateTime::now_utc();

        assert!(s.expires_at >= before + time::Duration::days(7));
        assert!(s.expires_at <= after + time::Duration::days(7));
    }

    #[test]
    fn test_identity_is_cached_user_id() {
        assert_eq!(session().identity(), &UserId::new("u1"));
    }

    #[test]
    fn test_apply_replaces_snapshots_only() {
        let mut s = session();
        let id = s.id.clone();
        let expires = s.expires_at;

        s.apply(&SessionPatch::snapshots(
            UserSnapshot::new("u1", "alice-renamed"),
            vec![],
        ));

        assert_eq!(s.user.username, "alice-renamed");
        assert!(s.guilds.is_empty());
        assert_eq!(s.access_token, "t1", "token is not rotated");
        assert_eq!(s.id, id);
        assert_eq!(s.expires_at, expires);
    }

    #[test]
    fn test_apply_empty_patch_is_noop() {
        let mut s = session();
        let before = s.clone();

        s.apply(&SessionPatch::default());

        assert_eq!(s, before);
    }

    #[test]
    fn test_is_expired_at_boundary() {
        let s = session();

        assert!(!s.is_expired_at(s.expires_at - time::Duration::seconds(1)));
        assert!(s.is_expired_at(s.expires_at));
    }

    #[test]
    fn test_session_json_uses_rfc3339_timestamp() {
        let s = session();

        let json = serde_json::to_value(&s).unwrap();
        let back: Session = serde_json::from_value(json.clone()).unwrap();

        assert!(json["expires_at"].is_string());
        assert_eq!(back, s);
    }
}
