//! Typed configuration loaded from environment variables at bootstrap.

use indexer_util::errors::{IndexerError, IndexerResult};

fn require_env(name: &str) -> IndexerResult<String> {
    std::env::var(name).map_err(|_| IndexerError::InternalError(format!("missing required env var {name}")))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn env_bool(name: &str, default: bool) -> IndexerResult<bool> {
    match std::env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|_| IndexerError::InternalError(format!("env var {name} is not a boolean"))),
        Err(_) => Ok(default),
    }
}

fn env_u64(name: &str, default: u64) -> IndexerResult<u64> {
    match std::env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|_| IndexerError::InternalError(format!("env var {name} is not a number"))),
        Err(_) => Ok(default),
    }
}

/// Bootstrap configuration for the indexing proxy. Mirrors the reference
/// implementation's `requireEnv`-style required-variable loading.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub storage_url: String,
    pub bind_addr: String,
    pub upload_prefix: String,
    pub auth_username: String,
    pub auth_password: String,
    pub cache_purge_webhook: Option<String>,
    pub session_timeout_secs: u64,
    pub require_changelog: bool,
    /// Gates the query-parameter overrides (branch, publish time, mcmod
    /// metadata size, requireChangelog) that the reference implementation
    /// restricts to a development environment.
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> IndexerResult<Self> {
        Ok(Self {
            database_url: require_env("DATABASE_URL")?,
            storage_url: require_env("STORAGE_URL")?,
            bind_addr: optional_env("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            upload_prefix: optional_env("UPLOAD_PREFIX").unwrap_or_else(|| "/repository".to_string()),
            auth_username: require_env("AUTH_USERNAME")?,
            auth_password: require_env("AUTH_PASSWORD")?,
            cache_purge_webhook: optional_env("CACHE_PURGE_WEBHOOK"),
            session_timeout_secs: env_u64("SESSION_TIMEOUT_SECS", 300)?,
            require_changelog: env_bool("REQUIRE_CHANGELOG", true)?,
            dev_mode: env_bool("DEV_MODE", false)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_GUARD: Mutex<()> = Mutex::new(());

    #[test]
    fn loads_required_and_defaulted_fields() {
        let _guard = ENV_GUARD.lock().unwrap();
        std::env::set_var("DATABASE_URL", "postgres://localhost/test");
        std::env::set_var("STORAGE_URL", "null://");
        std::env::set_var("AUTH_USERNAME", "alice");
        std::env::set_var("AUTH_PASSWORD", "hunter2");
        std::env::remove_var("SESSION_TIMEOUT_SECS");
        std::env::remove_var("DEV_MODE");

        let config = Config::from_env().unwrap();
        assert_eq!(config.session_timeout_secs, 300);
        assert!(!config.dev_mode);
        assert!(config.require_changelog);

        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("STORAGE_URL");
        std::env::remove_var("AUTH_USERNAME");
        std::env::remove_var("AUTH_PASSWORD");
    }

    #[test]
    fn missing_required_var_is_internal_error() {
        let _guard = ENV_GUARD.lock().unwrap();
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("STORAGE_URL");
        std::env::remove_var("AUTH_USERNAME");
        std::env::remove_var("AUTH_PASSWORD");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, IndexerError::InternalError(_)));
    }
}
