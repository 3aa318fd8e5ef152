//! # Mango
//!
//! Session-backed dashboard API for the Mango Discord bot.
//!
//! Users log in through the provider's OAuth flow; the server keeps one
//! session per browser holding the user's tokens and a cached copy of
//! their profile and guild list. Requests are served from that cache, and
//! a background [`ReconcileTask`](mango_reconcile::ReconcileTask) keeps it
//! fresh.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mango::prelude::*;
//!
//! // let config = MangoConfig::from_env()?;
//! // let store = Arc::new(JsonFileStore::open(&config.session_file).await?);
//! // let client = Arc::new(DiscordClient::new(config.discord.clone())?);
//! // let server = MangoServerBuilder::new()
//! //     .config(&config)?
//! //     .build(store, client)
//! //     .await?;
//! // server.run_until(tokio::signal::ctrl_c()).await
//! ```

mod config;
mod error;
pub mod guard;
mod handler;
mod server;
mod state;

pub use config::{ConfigError, MIN_SECRET_LEN, MangoConfig, cookie_key};
pub use error::{ApiError, MangoError};
pub use server::{MangoServer, MangoServerBuilder, router};
pub use state::AppState;

/// Re-exports everything a binary needs to wire up a server.
pub mod prelude {
    pub use std::sync::Arc;

    pub use mango_reconcile::{ReconcileConfig, ReconcileReport, ReconcileTask, Reconciler};
    pub use mango_session::{
        JsonFileStore, MemorySessionStore, Session, SessionConfig, SessionId, SessionStore,
    };
    pub use mango_upstream::{
        DiscordClient, DiscordConfig, GuildDirectory, IdentityClient, UpstreamError,
    };

    pub use crate::guard::{Access, GuardRejection, Guarded, authorize};
    pub use crate::{
        ApiError, AppState, MangoConfig, MangoError, MangoServer, MangoServerBuilder, router,
    };
}
