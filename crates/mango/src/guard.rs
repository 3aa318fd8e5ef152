//! Per-request access guard.
//!
//! Protected routes take a [`Guarded<P>`] extractor. Before the handler
//! body runs, the extractor loads the session named by the signed session
//! cookie and checks that it is usable. If it is not, the request is
//! answered right there with a [`GuardRejection`] and the handler (and so
//! any upstream call it would make) never runs.
//!
//! | Policy         | Rejection                                     |
//! |----------------|-----------------------------------------------|
//! | [`UserStatus`] | `200 {"authed": false, "user": {}}`           |
//! | [`GuildStatus`]| `200 {"authed": false, "guilds": []}`         |
//! | [`Manage`]     | `403 {"message": "Unauthorized"}`             |
//!
//! Status endpoints answer `200` so the dashboard can render a logged-out
//! view without treating it as an error.

use std::marker::PhantomData;

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::SignedCookieJar;
use mango_session::{Session, SessionId, SessionStore};
use serde_json::json;

use crate::{ApiError, AppState};

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Which cached data a read-only status endpoint reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusView {
    User,
    Guilds,
}

/// The kind of route being guarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Read-only status endpoint; rejected with an unauthenticated view.
    Status(StatusView),
    /// State-changing management endpoint; rejected with 403.
    Manage,
}

/// Why a request did not pass the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GuardRejection {
    #[error("not authenticated")]
    Unauthenticated(StatusView),

    #[error("unauthorized")]
    Forbidden,
}

impl From<Access> for GuardRejection {
    fn from(access: Access) -> Self {
        match access {
            Access::Status(view) => Self::Unauthenticated(view),
            Access::Manage => Self::Forbidden,
        }
    }
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated(StatusView::User) => {
                Json(json!({ "authed": false, "user": {} })).into_response()
            }
            Self::Unauthenticated(StatusView::Guilds) => {
                Json(json!({ "authed": false, "guilds": [] })).into_response()
            }
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({ "message": "Unauthorized" })),
            )
                .into_response(),
        }
    }
}

/// Lets `session` through if it is usable; otherwise picks the rejection
/// for `access`.
///
/// Pure: the session is returned unchanged and nothing else is touched.
pub fn authorize(session: Option<Session>, access: Access) -> Result<Session, GuardRejection> {
    match session {
        Some(session) if session.is_usable() => Ok(session),
        _ => Err(access.into()),
    }
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// Compile-time choice of [`Access`] for a [`Guarded`] extractor.
pub trait AccessPolicy: Send + Sync + 'static {
    const ACCESS: Access;
}

/// `GET /user`.
pub enum UserStatus {}

/// `GET /guilds`.
pub enum GuildStatus {}

/// Management routes.
pub enum Manage {}

impl AccessPolicy for UserStatus {
    const ACCESS: Access = Access::Status(StatusView::User);
}

impl AccessPolicy for GuildStatus {
    const ACCESS: Access = Access::Status(StatusView::Guilds);
}

impl AccessPolicy for Manage {
    const ACCESS: Access = Access::Manage;
}

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// The session named by the request's cookie, if any.
///
/// Absent when there is no cookie, the signature does not verify, or the
/// store has no live record for the id. Never rejects except on a store
/// failure.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<Session>);

impl<S, C> FromRequestParts<AppState<S, C>> for CurrentSession
where
    S: SessionStore,
    C: Send + Sync + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S, C>,
    ) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::from_headers(&parts.headers, state.key().clone());
        let Some(cookie) = jar.get(&state.sessions.cookie_name) else {
            return Ok(Self(None));
        };

        let id = SessionId::new(cookie.value());
        Ok(Self(state.store.get(&id).await?))
    }
}

/// A usable session, checked against policy `P` before the handler runs.
pub struct Guarded<P> {
    pub session: Session,
    _policy: PhantomData<fn() -> P>,
}

impl<S, C, P> FromRequestParts<AppState<S, C>> for Guarded<P>
where
    S: SessionStore,
    C: Send + Sync + 'static,
    P: AccessPolicy,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S, C>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = CurrentSession::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match authorize(session, P::ACCESS) {
            Ok(session) => Ok(Self {
                session,
                _policy: PhantomData,
            }),
            Err(rejection) => {
                tracing::debug!(
                    access = ?P::ACCESS,
                    path = %parts.uri.path(),
                    "guard rejected request"
                );
                Err(rejection.into_response())
            }
        }
    }
}
