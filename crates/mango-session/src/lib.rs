//! Dashboard session management for Mango.
//!
//! This crate owns everything the rest of the workspace needs to know about
//! a logged-in dashboard user:
//!
//! 1. **Snapshots**: the cached profile ([`UserSnapshot`]) and guild
//!    memberships ([`GuildSnapshot`]) copied from the identity provider
//! 2. **Sessions**: the record binding a browser to its credentials and
//!    cached snapshots ([`Session`])
//! 3. **Usability**: the single rule deciding whether a session may be
//!    used for authenticated work ([`is_usable`])
//! 4. **Storage**: the [`SessionStore`] trait plus an in-memory and a
//!    JSON-file implementation
//!
//! # How it fits in the stack
//!
//! ```text
//! HTTP layer (mango)            ← reads one session per request
//! Reconciliation (mango-reconcile) ← rewrites cached snapshots in bulk
//!     ↕
//! Session layer (this crate)    ← owns the durable representation
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod file;
mod memory;
mod policy;
mod session;
mod snapshot;
mod store;

pub use error::StoreError;
pub use file::JsonFileStore;
pub use memory::MemorySessionStore;
pub use policy::is_usable;
pub use session::{Session, SessionConfig, SessionId, SessionPatch};
pub use snapshot::{GuildId, GuildSnapshot, UserId, UserSnapshot};
pub use store::SessionStore;
