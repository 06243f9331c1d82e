use std::time::Duration;

use rankmirror_core::config::{self, VarLookup};
use rankmirror_core::error::CoreError;
use rankmirror_core::leaderboard::MAX_LIMIT;

/// Sync pipeline configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Time between scheduled cycles (default: 60s).
    pub interval: Duration,
    /// Rows extracted per cycle, within `1..=200` (default: 200).
    pub row_limit: i64,
    /// Run a single cycle and exit (standalone binary only).
    pub run_once: bool,
    /// How long shutdown waits for an in-flight cycle (default: 30s).
    pub shutdown_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            row_limit: MAX_LIMIT,
            run_once: false,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl SyncConfig {
    /// Load from environment-style variables.
    ///
    /// | Env Var                 | Default |
    /// |-------------------------|---------|
    /// | `SYNC_INTERVAL_SECS`    | `60`    |
    /// | `SYNC_ROW_LIMIT`        | `200`   |
    /// | `SYNC_RUN_ONCE`         | `false` |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`    |
    pub fn from_vars(lookup: VarLookup<'_>) -> Result<Self, CoreError> {
        let interval_secs: u64 = config::parse_or(lookup, "SYNC_INTERVAL_SECS", 60)?;
        if interval_secs == 0 {
            return Err(CoreError::Config {
                key: "SYNC_INTERVAL_SECS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let row_limit: i64 = config::parse_or(lookup, "SYNC_ROW_LIMIT", MAX_LIMIT)?;

        Ok(Self {
            interval: Duration::from_secs(interval_secs),
            row_limit: row_limit.clamp(1, MAX_LIMIT),
            run_once: config::flag_or(lookup, "SYNC_RUN_ONCE", false)?,
            shutdown_timeout: Duration::from_secs(config::parse_or(
                lookup,
                "SHUTDOWN_TIMEOUT_SECS",
                30,
            )?),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<SyncConfig, CoreError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SyncConfig::from_vars(&|k: &str| vars.get(k).cloned())
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.interval, Duration::from_secs(60));
        assert_eq!(cfg.row_limit, 200);
        assert!(!cfg.run_once);
    }

    #[test]
    fn row_limit_is_clamped_to_ceiling() {
        assert_eq!(load(&[("SYNC_ROW_LIMIT", "5000")]).unwrap().row_limit, 200);
        assert_eq!(load(&[("SYNC_ROW_LIMIT", "-1")]).unwrap().row_limit, 1);
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(load(&[("SYNC_INTERVAL_SECS", "0")]).is_err());
    }
}
