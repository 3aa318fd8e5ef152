//! Cached upstream data: the profile and guild snapshots stored on a session.
//!
//! The identity provider returns much more than we look at. Each snapshot
//! names the fields the dashboard actually reads and keeps everything else
//! in `extra`, so a round trip through the store loses nothing the frontend
//! might want to render.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Stable identifier of an upstream user.
///
/// This is the *identity key*: two sessions with the same `UserId` belong to
/// the same logical user, and reconciliation refreshes them together.
///
/// Upstream snowflakes are 64-bit integers sent as strings, so we keep them
/// as strings and never do arithmetic on them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Creates a `UserId` from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an upstream guild (server).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuildId(pub String);

impl GuildId {
    /// Creates a `GuildId` from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Cached copy of the authenticated user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSnapshot {
    /// Identity key used for deduplication and write-back.
    pub id: UserId,

    /// Account handle.
    #[serde(default)]
    pub username: String,

    /// Display name, when the user has set one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,

    /// Avatar hash, when the user has uploaded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// Every other field the upstream sent, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserSnapshot {
    /// A snapshot carrying only an identity key and a username.
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            username: username.into(),
            global_name: None,
            avatar: None,
            extra: Map::new(),
        }
    }
}

/// Cached copy of one guild membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildSnapshot {
    pub id: GuildId,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Whether the user owns the guild.
    #[serde(default)]
    pub owner: bool,

    /// Permission bitset, as the decimal string the upstream sends.
    #[serde(default)]
    pub permissions: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GuildSnapshot {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: GuildId::new(id),
            name: name.into(),
            icon: None,
            owner: false,
            permissions: "0".to_string(),
            extra: Map::new(),
        }
    }
}
