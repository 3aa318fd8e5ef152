//! Shared state handed to every request handler.

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::{Cookie, Key, SameSite};
use mango_session::{SessionConfig, SessionId};

/// Server state, cloned into each request.
///
/// Everything heavy sits behind an `Arc`, so a clone is a few reference
/// count bumps. `S` is the session store and `C` the upstream client.
pub struct AppState<S, C> {
    pub(crate) store: Arc<S>,
    pub(crate) client: Arc<C>,
    pub(crate) sessions: Arc<SessionConfig>,
    pub(crate) frontend_url: Arc<str>,
    key: Key,
}

impl<S, C> AppState<S, C> {
    pub fn new(
        store: Arc<S>,
        client: Arc<C>,
        sessions: SessionConfig,
        frontend_url: impl Into<Arc<str>>,
        key: Key,
    ) -> Self {
        Self {
            store,
            client,
            sessions: Arc::new(sessions),
            frontend_url: frontend_url.into(),
            key,
        }
    }

    pub(crate) fn key(&self) -> &Key {
        &self.key
    }

    /// The session cookie carrying `id`.
    pub(crate) fn session_cookie(&self, id: &SessionId) -> Cookie<'static> {
        let max_age = time::Duration::try_from(self.sessions.ttl).unwrap_or(time::Duration::MAX);
        Cookie::build((self.sessions.cookie_name.clone(), id.as_str().to_string()))
            .http_only(true)
            .secure(self.sessions.secure_cookie)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(max_age)
            .build()
    }

    /// A cookie that, once removed from the jar, clears the session cookie.
    pub(crate) fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.sessions.cookie_name.clone(), ""))
            .path("/")
            .build()
    }
}

// Not derived: `S` and `C` need not be `Clone`.
impl<S, C> Clone for AppState<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            client: Arc::clone(&self.client),
            sessions: Arc::clone(&self.sessions),
            frontend_url: Arc::clone(&self.frontend_url),
            key: self.key.clone(),
        }
    }
}

/// Lets `SignedCookieJar` find the signing key in the state.
impl<S, C> FromRef<AppState<S, C>> for Key {
    fn from_ref(state: &AppState<S, C>) -> Self {
        state.key.clone()
    }
}
