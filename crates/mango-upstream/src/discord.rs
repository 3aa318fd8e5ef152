//! Discord REST implementation of the upstream traits.
//!
//! User calls carry `Authorization: Bearer <access token>`; directory calls
//! carry `Authorization: Bot <bot token>`. Every request shares one
//! `reqwest::Client` (and so one connection pool) with a fixed timeout.

use std::time::Duration;

use mango_session::{GuildId, GuildSnapshot, UserSnapshot};
use serde::de::DeserializeOwned;

use crate::{BotStats, GuildDirectory, IdentityClient, TokenGrant, UpstreamError};

/// Settings for talking to Discord.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// OAuth2 application id.
    pub client_id: String,
    /// OAuth2 application secret.
    pub client_secret: String,
    /// Must match the redirect registered with the application.
    pub redirect_uri: String,
    /// Token for bot-authenticated calls.
    pub bot_token: String,
    /// API root, without a trailing slash. Overridable for tests.
    pub api_base: String,
    /// Per-request timeout. Default: 10 seconds.
    pub request_timeout: Duration,
}

impl DiscordConfig {
    pub const DEFAULT_API_BASE: &'static str = "https://discord.com/api/v10";
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            bot_token: String::new(),
            api_base: Self::DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Discord client implementing [`IdentityClient`] and [`GuildDirectory`].
#[derive(Debug, Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    config: DiscordConfig,
}

impl DiscordClient {
    /// Builds the client.
    ///
    /// # Errors
    /// Returns [`UpstreamError::Http`] if the TLS backend can't initialize.
    pub fn new(config: DiscordConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("mango-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        authorization: String,
    ) -> Result<T, UpstreamError> {
        let response = self
            .http
            .get(self.url(path))
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await?;
        decode(response).await
    }
}

/// Turns a response into `T`, mapping non-2xx statuses to
/// [`UpstreamError::Status`] with the body attached for the logs.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, UpstreamError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}

impl IdentityClient for DiscordClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, UpstreamError> {
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        let response = self
            .http
            .post(self.url("/oauth2/token"))
            .form(&form)
            .send()
            .await?;
        let grant: TokenGrant = decode(response).await?;
        tracing::debug!(scope = %grant.scope, "authorization code exchanged");
        Ok(grant)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserSnapshot, UpstreamError> {
        self.get_json("/users/@me", format!("Bearer {access_token}"))
            .await
    }

    async fn fetch_guilds(
        &self,
        access_token: &str,
    ) -> Result<Vec<GuildSnapshot>, UpstreamError> {
        self.get_json("/users/@me/guilds", format!("Bearer {access_token}"))
            .await
    }
}

impl GuildDirectory for DiscordClient {
    async fn guild(&self, guild_id: &GuildId) -> Result<serde_json::Value, UpstreamError> {
        self.get_json(
            &format!("/guilds/{guild_id}"),
            format!("Bot {}", self.config.bot_token),
        )
        .await
    }

    async fn stats(&self) -> Result<BotStats, UpstreamError> {
        let guilds: Vec<serde_json::Value> = self
            .get_json("/users/@me/guilds", format!("Bot {}", self.config.bot_token))
            .await?;
        Ok(BotStats {
            guilds: guilds.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_points_at_v10() {
        let cfg = DiscordConfig::default();
        assert_eq!(cfg.api_base, "https://discord.com/api/v10");
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_url_tolerates_trailing_slash() {
        let client = DiscordClient::new(DiscordConfig {
            api_base: "http://localhost:9999/api/".into(),
            ..DiscordConfig::default()
        })
        .unwrap();

        assert_eq!(client.url("/users/@me"), "http://localhost:9999/api/users/@me");
    }
}
