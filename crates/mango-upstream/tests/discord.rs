//! Integration tests for `DiscordClient` against a local fake Discord.
//!
//! The fake is a small axum app bound to an ephemeral port. It checks the
//! `Authorization` header the same way Discord does and answers with canned
//! payloads, so these tests exercise the real HTTP path end to end.

use axum::extract::{Form, Path};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use mango_session::GuildId;
use mango_upstream::{DiscordClient, DiscordConfig, GuildDirectory, IdentityClient, UpstreamError};
use serde_json::{Value, json};
use std::collections::HashMap;

// =========================================================================
// Fake Discord
// =========================================================================

fn auth(headers: &HeaderMap) -> &str {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

async fn token(Form(form): Form<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    if form.get("code").map(String::as_str) != Some("good-code")
        || form.get("grant_type").map(String::as_str) != Some("authorization_code")
    {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_grant" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "access_token": "user-token",
            "token_type": "Bearer",
            "expires_in": 604800,
            "refresh_token": "refresh-token",
            "scope": "identify guilds"
        })),
    )
}

async fn me(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    match auth(&headers) {
        "Bearer user-token" => (
            StatusCode::OK,
            Json(json!({ "id": "u1", "username": "alice", "locale": "en-US" })),
        ),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "message": "401: Unauthorized" }))),
    }
}

async fn my_guilds(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    match auth(&headers) {
        "Bearer user-token" => (
            StatusCode::OK,
            Json(json!([
                { "id": "g1", "name": "One", "owner": true, "permissions": "8" },
                { "id": "g2", "name": "Two", "owner": false, "permissions": "0" }
            ])),
        ),
        "Bot bot-token" => (
            StatusCode::OK,
            Json(json!([{ "id": "g1" }, { "id": "g2" }, { "id": "g3" }])),
        ),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "message": "401: Unauthorized" }))),
    }
}

async fn guild(headers: HeaderMap, Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if auth(&headers) != "Bot bot-token" {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    (StatusCode::OK, Json(json!({ "id": id, "name": "Managed" })))
}

async fn spawn_fake_discord() -> String {
    let app = Router::new()
        .route("/oauth2/token", post(token))
        .route("/users/@me", get(me))
        .route("/users/@me/guilds", get(my_guilds))
        .route("/guilds/{id}", get(guild));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn client() -> DiscordClient {
    DiscordClient::new(DiscordConfig {
        client_id: "app".into(),
        client_secret: "secret".into(),
        redirect_uri: "http://localhost/callback".into(),
        bot_token: "bot-token".into(),
        api_base: spawn_fake_discord().await,
        ..DiscordConfig::default()
    })
    .unwrap()
}

// =========================================================================
// IdentityClient
// =========================================================================

#[tokio::test]
async fn test_exchange_code_returns_grant() {
    let client = client().await;

    let grant = client.exchange_code("good-code").await.unwrap();

    assert_eq!(grant.access_token, "user-token");
    assert_eq!(grant.refresh_token, "refresh-token");
}

#[tokio::test]
async fn test_exchange_code_rejected_maps_to_status_error() {
    let client = client().await;

    let err = client.exchange_code("stale-code").await.unwrap_err();

    assert!(
        matches!(
            err,
            UpstreamError::Status { status: 400, ref body } if body.contains("invalid_grant")
        ),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_fetch_profile_decodes_snapshot() {
    let client = client().await;

    let user = client.fetch_profile("user-token").await.unwrap();

    assert_eq!(user.id.as_str(), "u1");
    assert_eq!(user.username, "alice");
    assert_eq!(user.extra.get("locale"), Some(&Value::from("en-US")));
}

#[tokio::test]
async fn test_fetch_profile_bad_token_is_auth_rejection() {
    let client = client().await;

    let err = client.fetch_profile("revoked").await.unwrap_err();

    assert!(err.is_auth_rejection());
}

#[tokio::test]
async fn test_fetch_guilds_decodes_list() {
    let client = client().await;

    let guilds = client.fetch_guilds("user-token").await.unwrap();

    assert_eq!(guilds.len(), 2);
    assert!(guilds[0].owner);
    assert_eq!(guilds[1].permissions, "0");
}

// =========================================================================
// GuildDirectory
// =========================================================================

#[tokio::test]
async fn test_guild_uses_bot_token() {
    let client = client().await;

    let guild = client.guild(&GuildId::new("g42")).await.unwrap();

    assert_eq!(guild["id"], "g42");
}

#[tokio::test]
async fn test_stats_counts_bot_guilds() {
    let client = client().await;

    let stats = client.stats().await.unwrap();

    assert_eq!(stats.guilds, 3);
}

#[tokio::test]
async fn test_unreachable_upstream_is_http_error() {
    // Port 9 (discard) on localhost is almost never listening.
    let client = DiscordClient::new(DiscordConfig {
        api_base: "http://127.0.0.1:9".into(),
        ..DiscordConfig::default()
    })
    .unwrap();

    let err = client.fetch_profile("user-token").await.unwrap_err();

    assert!(matches!(err, UpstreamError::Http(_)));
}
