//! Scriptable in-process upstream for tests.
//!
//! Tokens map to canned profiles and guild lists. Every call is counted per
//! token so tests can assert exactly how many upstream round trips a code
//! path made. Individual tokens can be made to fail, to panic, or the whole
//! mock can be slowed down to hold a reconciliation run open.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use mango_session::{GuildId, GuildSnapshot, UserSnapshot};

use crate::{BotStats, GuildDirectory, IdentityClient, TokenGrant, UpstreamError};

#[derive(Default)]
struct MockState {
    users: HashMap<String, (UserSnapshot, Vec<GuildSnapshot>)>,
    codes: HashMap<String, TokenGrant>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    profile_calls: HashMap<String, usize>,
    guild_calls: HashMap<String, usize>,
    exchange_calls: usize,
    directory_calls: usize,
    bot_guilds: usize,
    delay: Option<Duration>,
}

/// A fake identity provider. See the module docs.
#[derive(Default)]
pub struct MockIdentityClient {
    state: Mutex<MockState>,
}

impl MockIdentityClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers what `fetch_profile`/`fetch_guilds` return for `token`.
    pub fn with_user(self, token: &str, user: UserSnapshot, guilds: Vec<GuildSnapshot>) -> Self {
        self.set_user(token, user, guilds);
        self
    }

    /// Registers a code that `exchange_code` accepts.
    pub fn with_code(self, code: &str, grant: TokenGrant) -> Self {
        self.state().codes.insert(code.to_string(), grant);
        self
    }

    /// Sets how many guilds `GuildDirectory::stats` reports.
    pub fn with_bot_guilds(self, count: usize) -> Self {
        self.state().bot_guilds = count;
        self
    }

    /// Replaces the upstream data for `token` (simulates a profile change).
    pub fn set_user(&self, token: &str, user: UserSnapshot, guilds: Vec<GuildSnapshot>) {
        self.state().users.insert(token.to_string(), (user, guilds));
    }

    /// Makes every call with `token` fail with a 503 until [`heal`](Self::heal).
    pub fn fail_token(&self, token: &str) {
        self.state().failing.insert(token.to_string());
    }

    pub fn heal(&self, token: &str) {
        self.state().failing.remove(token);
    }

    /// Makes `fetch_profile` with `token` panic.
    pub fn panic_on(&self, token: &str) {
        self.state().panicking.insert(token.to_string());
    }

    /// Delays every user call by `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.state().delay = Some(delay);
    }

    pub fn profile_calls(&self, token: &str) -> usize {
        self.state().profile_calls.get(token).copied().unwrap_or(0)
    }

    pub fn guild_calls(&self, token: &str) -> usize {
        self.state().guild_calls.get(token).copied().unwrap_or(0)
    }

    /// Profile and guild calls across every token.
    pub fn total_user_calls(&self) -> usize {
        let state = self.state();
        state.profile_calls.values().sum::<usize>() + state.guild_calls.values().sum::<usize>()
    }

    pub fn exchange_calls(&self) -> usize {
        self.state().exchange_calls
    }

    pub fn directory_calls(&self) -> usize {
        self.state().directory_calls
    }

    async fn pause(delay: Option<Duration>) {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn rejected(token: &str) -> UpstreamError {
    UpstreamError::Status {
        status: 401,
        body: format!("unknown token {token}"),
    }
}

fn unavailable(token: &str) -> UpstreamError {
    UpstreamError::Status {
        status: 503,
        body: format!("scripted failure for {token}"),
    }
}

impl IdentityClient for MockIdentityClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, UpstreamError> {
        let mut state = self.state();
        state.exchange_calls += 1;
        state.codes.get(code).cloned().ok_or(UpstreamError::Status {
            status: 400,
            body: "invalid_grant".to_string(),
        })
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserSnapshot, UpstreamError> {
        let (delay, panics, result) = {
            let mut state = self.state();
            *state.profile_calls.entry(access_token.to_string()).or_default() += 1;
            let result = if state.failing.contains(access_token) {
                Err(unavailable(access_token))
            } else {
                state
                    .users
                    .get(access_token)
                    .map(|(user, _)| user.clone())
                    .ok_or_else(|| rejected(access_token))
            };
            (state.delay, state.panicking.contains(access_token), result)
        };
        Self::pause(delay).await;
        if panics {
            panic!("scripted panic for token {access_token}");
        }
        result
    }

    async fn fetch_guilds(&self, access_token: &str) -> Result<Vec<GuildSnapshot>, UpstreamError> {
        let (delay, result) = {
            let mut state = self.state();
            *state.guild_calls.entry(access_token.to_string()).or_default() += 1;
            let result = if state.failing.contains(access_token) {
                Err(unavailable(access_token))
            } else {
                state
                    .users
                    .get(access_token)
                    .map(|(_, guilds)| guilds.clone())
                    .ok_or_else(|| rejected(access_token))
            };
            (state.delay, result)
        };
        Self::pause(delay).await;
        result
    }
}

impl GuildDirectory for MockIdentityClient {
    async fn guild(&self, guild_id: &GuildId) -> Result<serde_json::Value, UpstreamError> {
        self.state().directory_calls += 1;
        Ok(serde_json::json!({ "id": guild_id, "name": "Mock Guild" }))
    }

    async fn stats(&self) -> Result<BotStats, UpstreamError> {
        let mut state = self.state();
        state.directory_calls += 1;
        Ok(BotStats {
            guilds: state.bot_guilds,
        })
    }
}
