//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chirp_shared::constants::{APP_NAME, DEFAULT_HTTP_PORT};
use chirp_shared::session::parse_pubkey_hex;

/// Where author profiles are resolved from.
#[derive(Clone, PartialEq)]
pub enum DirectorySource {
    /// Hosted identity provider user API.
    Hosted { api_url: String, secret_key: String },
    /// JSON file holding an array of user records.
    File(PathBuf),
    /// No users at all. Every feed with posts fails to resolve its authors.
    Empty,
}

// Hand-written so the secret key never reaches the logs.
impl fmt::Debug for DirectorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectorySource::Hosted { api_url, .. } => f
                .debug_struct("Hosted")
                .field("api_url", api_url)
                .field("secret_key", &"<redacted>")
                .finish(),
            DirectorySource::File(path) => f.debug_tuple("File").field(path).finish(),
            DirectorySource::Empty => f.write_str("Empty"),
        }
    }
}

/// Where posts are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// Platform data directory (`directories` crate).
    Default,
    Path(PathBuf),
    /// Private in-memory database, lost on exit.
    Memory,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH` (`:memory:` for an in-memory database)
    /// Default: platform data directory.
    pub database: DatabaseLocation,

    /// Ed25519 public key the identity provider signs sessions with
    /// (hex-encoded, 64 chars).
    /// Env: `IDENTITY_PUBKEY`
    /// Default: all-zeros, which rejects every session (development only).
    pub identity_pubkey: [u8; 32],

    /// Source of author profiles.
    /// Env: `IDENTITY_API_URL` + `IDENTITY_SECRET_KEY`, else `USER_DIRECTORY_PATH`
    /// Default: empty directory.
    pub directory: DirectorySource,

    /// Request timeout for the hosted identity provider.
    /// Env: `IDENTITY_TIMEOUT_SECS`
    /// Default: 10 seconds.
    pub identity_timeout: Duration,

    /// Human-readable name for this instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Chirp"`
    pub instance_name: String,

    /// Sustained requests per second allowed per client IP.
    /// Env: `RATE_LIMIT_PER_SEC`
    /// Default: `10`
    pub rate_limit_per_sec: f64,

    /// Burst size per client IP.
    /// Env: `RATE_LIMIT_BURST`
    /// Default: `30`
    pub rate_limit_burst: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database: DatabaseLocation::Default,
            identity_pubkey: [0u8; 32],
            directory: DirectorySource::Empty,
            identity_timeout: Duration::from_secs(10),
            instance_name: APP_NAME.to_string(),
            rate_limit_per_sec: 10.0,
            rate_limit_burst: 30.0,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = lookup("DATABASE_PATH").filter(|p| !p.is_empty()) {
            config.database = if path == ":memory:" {
                DatabaseLocation::Memory
            } else {
                DatabaseLocation::Path(PathBuf::from(path))
            };
        }

        if let Some(hex_key) = lookup("IDENTITY_PUBKEY") {
            match parse_pubkey_hex(&hex_key) {
                Ok(key) => config.identity_pubkey = key,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Invalid IDENTITY_PUBKEY, using default (dev-only)"
                    );
                }
            }
        }

        let api_url = lookup("IDENTITY_API_URL").filter(|v| !v.is_empty());
        let secret_key = lookup("IDENTITY_SECRET_KEY").filter(|v| !v.is_empty());
        match (api_url, secret_key) {
            (Some(api_url), Some(secret_key)) => {
                config.directory = DirectorySource::Hosted {
                    api_url,
                    secret_key,
                };
            }
            (Some(_), None) => {
                tracing::warn!("IDENTITY_API_URL set without IDENTITY_SECRET_KEY, ignoring");
            }
            _ => {}
        }

        if config.directory == DirectorySource::Empty {
            if let Some(path) = lookup("USER_DIRECTORY_PATH").filter(|p| !p.is_empty()) {
                config.directory = DirectorySource::File(PathBuf::from(path));
            }
        }

        if let Some(val) = lookup("IDENTITY_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.identity_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid IDENTITY_TIMEOUT_SECS, using default"),
            }
        }

        if let Some(name) = lookup("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Some(val) = lookup("RATE_LIMIT_PER_SEC") {
            match parse_positive(&val) {
                Some(rate) => config.rate_limit_per_sec = rate,
                None => tracing::warn!(value = %val, "Invalid RATE_LIMIT_PER_SEC, using default"),
            }
        }

        if let Some(val) = lookup("RATE_LIMIT_BURST") {
            // A bucket smaller than one token would reject every request.
            match parse_positive(&val).filter(|burst| *burst >= 1.0) {
                Some(burst) => config.rate_limit_burst = burst,
                None => tracing::warn!(value = %val, "Invalid RATE_LIMIT_BURST, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

fn parse_positive(val: &str) -> Option<f64> {
    val.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = config_from(&[]);
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.identity_pubkey, [0u8; 32]);
        assert_eq!(config.database, DatabaseLocation::Default);
        assert_eq!(config.directory, DirectorySource::Empty);
    }

    #[test]
    fn test_identity_pubkey_from_env() {
        let hex = "ab".repeat(32);
        let config = config_from(&[("IDENTITY_PUBKEY", hex.as_str())]);
        assert_eq!(config.identity_pubkey, [0xab; 32]);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("HTTP_ADDR", "not-an-addr"),
            ("IDENTITY_PUBKEY", "abcd"),
            ("RATE_LIMIT_PER_SEC", "-3"),
            ("IDENTITY_TIMEOUT_SECS", "0"),
        ]);
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.identity_pubkey, [0u8; 32]);
        assert_eq!(config.rate_limit_per_sec, 10.0);
        assert_eq!(config.identity_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_fractional_burst_below_one_token_rejected() {
        let config = config_from(&[("RATE_LIMIT_BURST", "0.5")]);
        assert_eq!(config.rate_limit_burst, 30.0);

        let config = config_from(&[("RATE_LIMIT_BURST", "1")]);
        assert_eq!(config.rate_limit_burst, 1.0);

        let config = config_from(&[("RATE_LIMIT_PER_SEC", "0.5")]);
        assert_eq!(config.rate_limit_per_sec, 0.5);
    }

    #[test]
    fn test_hosted_directory_wins_over_file() {
        let config = config_from(&[
            ("IDENTITY_API_URL", "https://api.identity.example"),
            ("IDENTITY_SECRET_KEY", "sk_test_123"),
            ("USER_DIRECTORY_PATH", "./users.json"),
        ]);
        assert_eq!(
            config.directory,
            DirectorySource::Hosted {
                api_url: "https://api.identity.example".into(),
                secret_key: "sk_test_123".into(),
            }
        );
    }

    #[test]
    fn test_file_directory_and_memory_database() {
        let config = config_from(&[
            ("USER_DIRECTORY_PATH", "./users.json"),
            ("DATABASE_PATH", ":memory:"),
        ]);
        assert_eq!(
            config.directory,
            DirectorySource::File(PathBuf::from("./users.json"))
        );
        assert_eq!(config.database, DatabaseLocation::Memory);
    }

    #[test]
    fn test_secret_key_not_in_debug_output() {
        let config = config_from(&[
            ("IDENTITY_API_URL", "https://api.identity.example"),
            ("IDENTITY_SECRET_KEY", "sk_live_very_secret"),
        ]);
        let printed = format!("{config:?}");
        assert!(!printed.contains("sk_live_very_secret"));
        assert!(printed.contains("<redacted>"));
    }
}
