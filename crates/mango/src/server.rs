//! `MangoServer` builder and server loop.
//!
//! This is the entry point for running the dashboard API. It ties the
//! layers together: HTTP routes → access guard → session store, with the
//! reconciliation task refreshing the store in the background.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum_extra::extract::cookie::Key;
use mango_reconcile::{ReconcileConfig, ReconcileTask, Reconciler};
use mango_session::{SessionConfig, SessionStore};
use mango_upstream::{GuildDirectory, IdentityClient};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::{AppState, ConfigError, MangoConfig, MangoError};

/// Builds the API router over `state`.
///
/// CORS admits only the configured frontend origin, with credentials, and
/// exposes `set-cookie`.
///
/// # Errors
/// [`ConfigError::Invalid`] if the frontend URL is not a valid header value.
pub fn router<S, C>(state: AppState<S, C>) -> Result<Router, ConfigError>
where
    S: SessionStore,
    C: IdentityClient + GuildDirectory,
{
    let origin = HeaderValue::from_str(&state.frontend_url)
        .map_err(|_| ConfigError::Invalid("PRODUCTION_URI"))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .expose_headers([SET_COOKIE]);

    Ok(Router::new()
        .route("/", get(handler::index))
        .route("/callback", get(handler::callback::<S, C>))
        .route("/user", get(handler::user))
        .route("/guilds", get(handler::guilds))
        .route("/manage/{guild_id}", get(handler::manage::<S, C>))
        .route("/logout", get(handler::logout::<S, C>))
        .route("/stats", get(handler::stats::<S, C>))
        .fallback(handler::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Builder for configuring and starting a Mango server.
///
/// # Example
///
/// ```rust,ignore
/// use mango::prelude::*;
///
/// let server = MangoServerBuilder::new()
///     .config(&config)?
///     .build(store, client)
///     .await?;
/// server.run_until(tokio::signal::ctrl_c()).await
/// ```
pub struct MangoServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    reconcile_config: ReconcileConfig,
    frontend_url: String,
    key: Option<Key>,
}

impl MangoServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            session_config: SessionConfig::default(),
            reconcile_config: ReconcileConfig::default(),
            frontend_url: "http://localhost:8080".to_string(),
            key: None,
        }
    }

    /// Applies everything in `config`: bind port, session and reconcile
    /// settings, frontend origin, and the cookie key.
    pub fn config(self, config: &MangoConfig) -> Result<Self, ConfigError> {
        Ok(self
            .bind(&format!("0.0.0.0:{}", config.port))
            .session_config(config.session.clone())
            .reconcile_config(config.reconcile.clone())
            .frontend_url(&config.frontend_url)
            .cookie_key(config.cookie_key()?))
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the background reconciliation configuration.
    pub fn reconcile_config(mut self, config: ReconcileConfig) -> Self {
        self.reconcile_config = config;
        self
    }

    /// Sets the dashboard origin (CORS and post-login redirect).
    pub fn frontend_url(mut self, url: &str) -> Self {
        self.frontend_url = url.to_string();
        self
    }

    /// Sets the key session cookies are signed with.
    pub fn cookie_key(mut self, key: Key) -> Self {
        self.key = Some(key);
        self
    }

    /// Binds the listener and assembles the server.
    ///
    /// # Errors
    /// [`ConfigError::Missing`] without a cookie key, [`ConfigError::Invalid`]
    /// for a bad frontend URL, or an I/O error if the bind fails.
    pub async fn build<S, C>(
        self,
        store: Arc<S>,
        client: Arc<C>,
    ) -> Result<MangoServer<S, C>, MangoError>
    where
        S: SessionStore,
        C: IdentityClient + GuildDirectory,
    {
        let key = self.key.ok_or(ConfigError::Missing("SESSION_SECRET"))?;
        let state = AppState::new(
            Arc::clone(&store),
            Arc::clone(&client),
            self.session_config,
            self.frontend_url,
            key,
        );
        let router = router(state)?;
        let listener = TcpListener::bind(&self.bind_addr).await?;

        let reconciler = Arc::new(Reconciler::with_config(
            store,
            client,
            &self.reconcile_config,
        ));

        Ok(MangoServer {
            listener,
            router,
            reconciler,
            reconcile_config: self.reconcile_config,
        })
    }
}

impl Default for MangoServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Mango server.
///
/// Call [`run_until()`](Self::run_until) to start serving.
pub struct MangoServer<S, C> {
    listener: TcpListener,
    router: Router,
    reconciler: Arc<Reconciler<S, C>>,
    reconcile_config: ReconcileConfig,
}

impl<S, C> MangoServer<S, C>
where
    S: SessionStore,
    C: IdentityClient + GuildDirectory,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The reconciler the background task drives.
    pub fn reconciler(&self) -> &Arc<Reconciler<S, C>> {
        &self.reconciler
    }

    /// Serves requests and runs the reconciliation task until `shutdown`
    /// resolves.
    ///
    /// On shutdown, in-flight requests are drained first, then the
    /// reconciliation task is stopped after its current run.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), MangoError>
    where
        F: Future + Send + 'static,
    {
        let task = ReconcileTask::start(Arc::clone(&self.reconciler), self.reconcile_config);
        tracing::info!(addr = ?self.listener.local_addr().ok(), "Mango server running");

        let served = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("shutdown signal received");
            })
            .await;

        task.stop().await;
        served?;
        Ok(())
    }
}
