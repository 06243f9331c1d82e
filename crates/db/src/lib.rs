//! PostgreSQL access for the source (game) store and the cache store.
//!
//! Repositories are zero-sized structs taking `&PgPool`; the [`store`]
//! module wraps them behind the [`SourceStore`] and [`CacheStore`] traits
//! consumed by the sync pipeline and the read API.

use std::time::Duration;

use rankmirror_core::config::{self, VarLookup};
use rankmirror_core::error::CoreError;
use sqlx::postgres::PgPoolOptions;

pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod models;
pub mod repositories;
pub mod store;

pub use error::StoreError;
pub use store::{CacheStore, PgCacheStore, PgSourceStore, SourceStore};

pub type DbPool = sqlx::PgPool;

/// Connection settings for one pool.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    /// Upper bound on open connections.
    pub max_connections: u32,
    /// How long a caller waits for a connection before failing.
    pub connect_timeout: Duration,
}

impl DbConfig {
    /// Cache store settings.
    ///
    /// | Env Var                         | Default  |
    /// |---------------------------------|----------|
    /// | `CACHE_DATABASE_URL`            | required |
    /// | `CACHE_DB_MAX_CONNECTIONS`      | `5`      |
    /// | `CACHE_DB_CONNECT_TIMEOUT_SECS` | `10`     |
    pub fn cache_from_vars(lookup: VarLookup<'_>) -> Result<Self, CoreError> {
        Ok(Self {
            url: config::required(lookup, "CACHE_DATABASE_URL")?,
            max_connections: config::parse_or(lookup, "CACHE_DB_MAX_CONNECTIONS", 5)?,
            connect_timeout: Duration::from_secs(config::parse_or(
                lookup,
                "CACHE_DB_CONNECT_TIMEOUT_SECS",
                10,
            )?),
        })
    }

    /// Source store settings, or `None` when no source is configured.
    ///
    /// | Env Var                          | Default |
    /// |----------------------------------|---------|
    /// | `SOURCE_DATABASE_URL`            | unset   |
    /// | `SOURCE_DB_MAX_CONNECTIONS`      | `2`     |
    /// | `SOURCE_DB_CONNECT_TIMEOUT_SECS` | `10`    |
    pub fn source_from_vars(lookup: VarLookup<'_>) -> Result<Option<Self>, CoreError> {
        let Some(url) = config::optional(lookup, "SOURCE_DATABASE_URL") else {
            return Ok(None);
        };
        Ok(Some(Self {
            url,
            max_connections: config::parse_or(lookup, "SOURCE_DB_MAX_CONNECTIONS", 2)?,
            connect_timeout: Duration::from_secs(config::parse_or(
                lookup,
                "SOURCE_DB_CONNECT_TIMEOUT_SECS",
                10,
            )?),
        }))
    }
}

/// Create a bounded connection pool.
///
/// Connections are opened lazily, so an unreachable server does not fail
/// startup; instead each acquire waits up to `connect_timeout` and then
/// fails with `sqlx::Error::PoolTimedOut`.
pub fn create_pool(config: &DbConfig) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(config.connect_timeout)
        .connect_lazy(&config.url)
}

/// Trivial round-trip to verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn cache_config_defaults() {
        let vars = HashMap::from([("CACHE_DATABASE_URL", "postgres://cache/db")]);
        let lookup = |k: &str| vars.get(k).map(|v| v.to_string());
        let cfg = DbConfig::cache_from_vars(&lookup).unwrap();
        assert_eq!(cfg.url, "postgres://cache/db");
        assert_eq!(cfg.max_connections, 5);
        assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn cache_config_requires_url() {
        let lookup = |_: &str| None;
        assert!(matches!(
            DbConfig::cache_from_vars(&lookup),
            Err(CoreError::MissingConfig("CACHE_DATABASE_URL"))
        ));
    }

    #[test]
    fn source_config_is_optional() {
        let lookup = |_: &str| None;
        assert!(DbConfig::source_from_vars(&lookup).unwrap().is_none());

        let vars = HashMap::from([
            ("SOURCE_DATABASE_URL", "postgres://game/db"),
            ("SOURCE_DB_MAX_CONNECTIONS", "3"),
        ]);
        let lookup = |k: &str| vars.get(k).map(|v| v.to_string());
        let cfg = DbConfig::source_from_vars(&lookup).unwrap().unwrap();
        assert_eq!(cfg.max_connections, 3);
    }
}
