//! Upstream identity provider abstraction for Mango.
//!
//! Provides the [`IdentityClient`] and [`GuildDirectory`] traits that the
//! HTTP layer and the reconciliation loop call, so neither knows which
//! provider (or which test double) sits behind them.
//!
//! # Feature Flags
//!
//! - `discord` (default): Discord REST implementation via `reqwest`
//! - `test-util`: [`MockIdentityClient`], a scriptable in-process double

#![allow(async_fn_in_trait)]

#[cfg(feature = "discord")]
mod discord;
mod error;
#[cfg(feature = "test-util")]
mod mock;

#[cfg(feature = "discord")]
pub use discord::{DiscordClient, DiscordConfig};
pub use error::UpstreamError;
#[cfg(feature = "test-util")]
pub use mock::MockIdentityClient;

use std::future::Future;

use mango_session::{GuildId, GuildSnapshot, UserSnapshot};
use serde::{Deserialize, Serialize};

/// Tokens returned by a successful authorization-code exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Lifetime of the access token in seconds, as reported upstream.
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub scope: String,
}

/// Aggregate numbers about the bot, served by the public stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotStats {
    /// Guilds the bot is a member of.
    pub guilds: usize,
}

/// Calls made on behalf of a logged-in user, with that user's credentials.
///
/// Each call may fail transiently; callers decide whether to retry.
pub trait IdentityClient: Send + Sync + 'static {
    /// Exchanges an authorization code for tokens.
    fn exchange_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<TokenGrant, UpstreamError>> + Send;

    /// Fetches the profile belonging to `access_token`.
    fn fetch_profile(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<UserSnapshot, UpstreamError>> + Send;

    /// Fetches the guild memberships belonging to `access_token`.
    fn fetch_guilds(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<Vec<GuildSnapshot>, UpstreamError>> + Send;
}

/// Calls made with the bot's own credentials.
pub trait GuildDirectory: Send + Sync + 'static {
    /// Guild details as the upstream returns them.
    fn guild(
        &self,
        guild_id: &GuildId,
    ) -> impl Future<Output = Result<serde_json::Value, UpstreamError>> + Send;

    /// Aggregate bot statistics.
    fn stats(&self) -> impl Future<Output = Result<BotStats, UpstreamError>> + Send;
}
