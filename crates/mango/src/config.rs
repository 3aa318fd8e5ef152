//! Service configuration loaded from the environment.

use std::path::PathBuf;
use std::time::Duration;

use axum_extra::extract::cookie::Key;
use mango_reconcile::ReconcileConfig;
use mango_session::SessionConfig;
use mango_upstream::DiscordConfig;

/// Minimum length of `SESSION_SECRET` in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Everything the API binary needs to start.
#[derive(Debug, Clone)]
pub struct MangoConfig {
    /// Upstream OAuth application and bot credentials.
    pub discord: DiscordConfig,

    /// Session lifetime and cookie settings.
    pub session: SessionConfig,

    /// Background refresh cadence.
    pub reconcile: ReconcileConfig,

    /// Secret the cookie signing key is derived from.
    pub session_secret: String,

    /// Dashboard origin: the only CORS origin and the post-login redirect.
    pub frontend_url: String,

    /// Port the HTTP listener binds on all interfaces. Default: 3000.
    pub port: u16,

    /// Where the JSON session store lives. Default: `sessions.json`.
    pub session_file: PathBuf,
}

impl MangoConfig {
    /// Loads configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a local `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        let discord = DiscordConfig {
            client_id: required("CLIENT_ID")?,
            client_secret: required("CLIENT_SECRET")?,
            redirect_uri: required("REDIRECT_URI")?,
            bot_token: required("BOT_TOKEN")?,
            ..DiscordConfig::default()
        };

        let session_secret = required("SESSION_SECRET")?;
        if session_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid(
                "SESSION_SECRET must be at least 32 bytes",
            ));
        }

        let frontend_url = required("PRODUCTION_URI")?;

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let session_file = lookup("SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("sessions.json"));

        let secure_cookie = lookup("SECURE_COOKIE")
            .unwrap_or_else(|| "false".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("SECURE_COOKIE"))?;

        let interval_secs: u64 = lookup("RECONCILE_INTERVAL_SECS")
            .unwrap_or_else(|| "60".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("RECONCILE_INTERVAL_SECS"))?;

        Ok(Self {
            discord,
            session: SessionConfig {
                secure_cookie,
                ..SessionConfig::default()
            },
            reconcile: ReconcileConfig::with_interval(Duration::from_secs(interval_secs)),
            session_secret,
            frontend_url,
            port,
            session_file,
        })
    }

    /// Derives the cookie signing key from `session_secret`.
    pub fn cookie_key(&self) -> Result<Key, ConfigError> {
        cookie_key(self.session_secret.as_bytes())
    }
}

/// Derives a signing key from `secret`, which must be at least
/// [`MIN_SECRET_LEN`] bytes.
pub fn cookie_key(secret: &[u8]) -> Result<Key, ConfigError> {
    if secret.len() < MIN_SECRET_LEN {
        return Err(ConfigError::Invalid(
            "SESSION_SECRET must be at least 32 bytes",
        ));
    }
    Ok(Key::derive_from(secret))
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let mut map: HashMap<String, String> = [
            ("CLIENT_ID", "123"),
            ("CLIENT_SECRET", "shh"),
            ("REDIRECT_URI", "http://localhost:3000/callback"),
            ("BOT_TOKEN", "bot"),
            ("SESSION_SECRET", SECRET),
            ("PRODUCTION_URI", "http://localhost:8080"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in pairs {
            if v.is_empty() {
                map.remove(*k);
            } else {
                map.insert(k.to_string(), v.to_string());
            }
        }
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_applies_defaults() {
        let config = MangoConfig::from_lookup(env(&[])).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.session_file, PathBuf::from("sessions.json"));
        assert!(!config.session.secure_cookie);
        assert_eq!(config.session.ttl, SessionConfig::DEFAULT_TTL);
        assert_eq!(config.reconcile.interval, Duration::from_secs(60));
        assert_eq!(config.discord.api_base, DiscordConfig::DEFAULT_API_BASE);
        assert_eq!(config.frontend_url, "http://localhost:8080");
    }

    #[test]
    fn test_from_lookup_reads_overrides() {
        let config = MangoConfig::from_lookup(env(&[
            ("PORT", "8081"),
            ("SESSION_FILE", "/var/lib/mango/sessions.json"),
            ("SECURE_COOKIE", "true"),
            ("RECONCILE_INTERVAL_SECS", "300"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8081);
        assert_eq!(config.session_file, PathBuf::from("/var/lib/mango/sessions.json"));
        assert!(config.session.secure_cookie);
        assert_eq!(config.reconcile.interval, Duration::from_secs(300));
    }

    #[test]
    fn test_from_lookup_missing_variable_is_named() {
        let err = MangoConfig::from_lookup(env(&[("BOT_TOKEN", "")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("BOT_TOKEN")));
    }

    #[test]
    fn test_from_lookup_short_secret_rejected() {
        let err = MangoConfig::from_lookup(env(&[("SESSION_SECRET", "short")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_lookup_bad_port_rejected() {
        let err = MangoConfig::from_lookup(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("PORT")));
    }

    #[test]
    fn test_cookie_key_requires_long_secret() {
        assert!(cookie_key(b"too short").is_err());
        assert!(cookie_key(SECRET.as_bytes()).is_ok());
    }
}
