use std::time::Duration;

use rankmirror_core::config::{self, VarLookup};
use rankmirror_core::error::CoreError;
use rankmirror_core::leaderboard::{DEFAULT_LIMIT, MAX_LIMIT};
use rankmirror_core::status::DEFAULT_STALE_AFTER;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `10000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    /// A single `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Age after which a published status counts as offline.
    pub stale_after: Duration,
    /// Lifetime of read-cache entries.
    pub read_cache_ttl: Duration,
    /// Leaderboard rows returned when the client gives no usable limit.
    pub default_limit: i64,
    /// Upper bound on leaderboard rows per request.
    pub max_limit: i64,
    /// Run the sync pipeline inside the API process.
    pub sync_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            cors_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            stale_after: DEFAULT_STALE_AFTER,
            read_cache_ttl: Duration::from_millis(30_000),
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
            sync_enabled: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment-style variables.
    ///
    /// | Env Var                     | Default   |
    /// |-----------------------------|-----------|
    /// | `HOST`                      | `0.0.0.0` |
    /// | `PORT`                      | `10000`   |
    /// | `CORS_ORIGINS`              | `*`       |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`      |
    /// | `SHUTDOWN_TIMEOUT_SECS`     | `30`      |
    /// | `STATUS_STALE_MS`           | `900000`  |
    /// | `READ_CACHE_TTL_MS`         | `30000`   |
    /// | `LEADERBOARD_DEFAULT_LIMIT` | `50`      |
    /// | `LEADERBOARD_MAX_LIMIT`     | `200`     |
    /// | `SYNC_ENABLED`              | `true`    |
    ///
    /// The max limit is clamped to `1..=200` and the default limit to
    /// `1..=max_limit`.
    pub fn from_vars(lookup: VarLookup<'_>) -> Result<Self, CoreError> {
        let defaults = Self::default();

        let cors_origins: Vec<String> = config::string_or(lookup, "CORS_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let stale_ms: u64 = config::parse_or(
            lookup,
            "STATUS_STALE_MS",
            defaults.stale_after.as_millis() as u64,
        )?;
        let ttl_ms: u64 = config::parse_or(
            lookup,
            "READ_CACHE_TTL_MS",
            defaults.read_cache_ttl.as_millis() as u64,
        )?;

        let max_limit =
            config::parse_or(lookup, "LEADERBOARD_MAX_LIMIT", MAX_LIMIT)?.clamp(1, MAX_LIMIT);
        let default_limit = config::parse_or(lookup, "LEADERBOARD_DEFAULT_LIMIT", DEFAULT_LIMIT)?
            .clamp(1, max_limit);

        Ok(Self {
            host: config::string_or(lookup, "HOST", &defaults.host),
            port: config::parse_or(lookup, "PORT", defaults.port)?,
            cors_origins,
            request_timeout_secs: config::parse_or(lookup, "REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: config::parse_or(lookup, "SHUTDOWN_TIMEOUT_SECS", 30)?,
            stale_after: Duration::from_millis(stale_ms),
            read_cache_ttl: Duration::from_millis(ttl_ms),
            default_limit,
            max_limit,
            sync_enabled: config::flag_or(lookup, "SYNC_ENABLED", true)?,
        })
    }

    /// Whether CORS should allow any origin.
    pub fn cors_allows_any(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}
