//! Route handlers for the dashboard API.
//!
//! Login flow:
//!   1. Dashboard sends the browser to the provider's consent page
//!   2. Provider redirects back to `/callback?code=...`
//!   3. Exchange the code, fetch profile and guilds, store a new session
//!   4. Set the signed session cookie and redirect to the dashboard
//!
//! After that, `/user` and `/guilds` serve the cached snapshots that the
//! reconciliation task keeps fresh. No request handler calls the upstream
//! for cached data.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use axum_extra::extract::SignedCookieJar;
use mango_session::{GuildId, Session, SessionId, SessionStore};
use mango_upstream::{GuildDirectory, IdentityClient};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::guard::{Guarded, GuildStatus, Manage, UserStatus};
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(crate) struct CallbackParams {
    code: Option<String>,
}

pub(crate) async fn index() -> Json<Value> {
    Json(json!({ "message": "Welcome to Mango's API!" }))
}

/// Completes the login started by the dashboard.
pub(crate) async fn callback<S, C>(
    State(state): State<AppState<S, C>>,
    jar: SignedCookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(SignedCookieJar, Redirect), ApiError>
where
    S: SessionStore,
    C: IdentityClient + GuildDirectory,
{
    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or(ApiError::MissingCode)?;

    let grant = state.client.exchange_code(&code).await?;
    let (user, guilds) = tokio::try_join!(
        state.client.fetch_profile(&grant.access_token),
        state.client.fetch_guilds(&grant.access_token),
    )?;

    let session = Session::new(
        grant.access_token,
        grant.refresh_token,
        user,
        guilds,
        state.sessions.ttl,
    );
    let cookie = state.session_cookie(&session.id);
    let (session_id, user_id) = (session.id.clone(), session.identity().clone());
    state.store.insert(session).await?;
    info!(%session_id, %user_id, "session created");

    Ok((jar.add(cookie), Redirect::to(&state.frontend_url)))
}

pub(crate) async fn user(guarded: Guarded<UserStatus>) -> Json<Value> {
    Json(json!({ "authed": true, "user": guarded.session.user }))
}

pub(crate) async fn guilds(guarded: Guarded<GuildStatus>) -> Json<Value> {
    Json(json!({ "authed": true, "guilds": guarded.session.guilds }))
}

/// Guild details for the management view, fetched with the bot's token.
pub(crate) async fn manage<S, C>(
    _guarded: Guarded<Manage>,
    State(state): State<AppState<S, C>>,
    Path(guild_id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
    S: SessionStore,
    C: IdentityClient + GuildDirectory,
{
    let guild = state.client.guild(&GuildId::new(guild_id)).await?;
    Ok(Json(json!({ "guild": guild })))
}

/// Ends the session. Succeeds whether or not one existed.
pub(crate) async fn logout<S, C>(
    State(state): State<AppState<S, C>>,
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, Json<Value>), ApiError>
where
    S: SessionStore,
    C: IdentityClient + GuildDirectory,
{
    if let Some(cookie) = jar.get(&state.sessions.cookie_name) {
        let id = SessionId::new(cookie.value());
        if state.store.delete_by_id(&id).await? {
            info!(session_id = %id, "session deleted");
        }
    }

    let jar = jar.remove(state.removal_cookie());
    Ok((jar, Json(json!({ "message": "Nothing to see here..." }))))
}

pub(crate) async fn stats<S, C>(
    State(state): State<AppState<S, C>>,
) -> Result<Json<Value>, ApiError>
where
    S: SessionStore,
    C: IdentityClient + GuildDirectory,
{
    let stats = state.client.stats().await?;
    Ok(Json(json!({ "message": stats })))
}

pub(crate) async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "404: not found" })),
    )
}
