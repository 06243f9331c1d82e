//! Staleness-qualified server status.
//!
//! The stored status record only says what the last sync attempt saw. A
//! reader decides whether that observation is still current by comparing
//! its age against the staleness window.

use std::time::Duration;

use serde::Serialize;

use crate::types::Timestamp;

/// Default staleness window: 15 minutes.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_millis(900_000);

/// The single stored status row, as published by the sync pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRecord {
    pub is_online: bool,
    pub online_count: i64,
    pub updated_at: Timestamp,
}

/// Status as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub is_online: bool,
    pub online_count: i64,
    pub updated_at: Option<Timestamp>,
    pub last_update_seconds: Option<i64>,
}

impl StatusView {
    /// The view reported when no status has ever been published.
    pub fn unknown() -> Self {
        Self {
            is_online: false,
            online_count: 0,
            updated_at: None,
            last_update_seconds: None,
        }
    }
}

/// Apply the staleness window to a stored record.
///
/// The server is reported online only when the stored flag is set AND the
/// record is no older than `stale_after`. The count is forced to 0 whenever
/// the result is offline. Records stamped in the future (clock skew between
/// writer and reader) are treated as age 0.
pub fn evaluate(record: Option<StatusRecord>, now: Timestamp, stale_after: Duration) -> StatusView {
    let Some(record) = record else {
        return StatusView::unknown();
    };

    let age_ms = (now - record.updated_at).num_milliseconds().max(0);
    let window_ms = i64::try_from(stale_after.as_millis()).unwrap_or(i64::MAX);
    let fresh = age_ms <= window_ms;

    let is_online = record.is_online && fresh;
    let online_count = if is_online {
        record.online_count.max(0)
    } else {
        0
    };

    StatusView {
        is_online,
        online_count,
        updated_at: Some(record.updated_at),
        last_update_seconds: Some(age_ms / 1000),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn record(is_online: bool, count: i64, age_secs: i64) -> StatusRecord {
        StatusRecord {
            is_online,
            online_count: count,
            updated_at: now() - chrono::Duration::seconds(age_secs),
        }
    }

    #[test]
    fn missing_record_is_offline_with_nulls() {
        let view = evaluate(None, now(), DEFAULT_STALE_AFTER);
        assert_eq!(view, StatusView::unknown());
    }

    #[test]
    fn stale_record_is_forced_offline() {
        let view = evaluate(Some(record(true, 42, 1000)), now(), DEFAULT_STALE_AFTER);
        assert!(!view.is_online);
        assert_eq!(view.online_count, 0);
        assert_eq!(view.last_update_seconds, Some(1000));
    }

    #[test]
    fn fresh_record_passes_flag_through() {
        let online = evaluate(Some(record(true, 7, 10)), now(), DEFAULT_STALE_AFTER);
        assert!(online.is_online);
        assert_eq!(online.online_count, 7);
        assert_eq!(online.last_update_seconds, Some(10));

        let offline = evaluate(Some(record(false, 7, 10)), now(), DEFAULT_STALE_AFTER);
        assert!(!offline.is_online);
    }

    #[test]
    fn count_is_zero_whenever_offline() {
        let view = evaluate(Some(record(false, 99, 5)), now(), DEFAULT_STALE_AFTER);
        assert_eq!(view.online_count, 0);
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let view = evaluate(Some(record(true, 1, 900)), now(), DEFAULT_STALE_AFTER);
        assert!(view.is_online);
        let view = evaluate(Some(record(true, 1, 901)), now(), DEFAULT_STALE_AFTER);
        assert!(!view.is_online);
    }

    #[test]
    fn future_timestamp_counts_as_fresh() {
        let view = evaluate(Some(record(true, 3, -30)), now(), DEFAULT_STALE_AFTER);
        assert!(view.is_online);
        assert_eq!(view.last_update_seconds, Some(0));
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(evaluate(None, now(), DEFAULT_STALE_AFTER)).unwrap();
        assert_eq!(json["isOnline"], false);
        assert_eq!(json["onlineCount"], 0);
        assert!(json["updatedAt"].is_null());
        assert!(json["lastUpdateSeconds"].is_null());
    }
}
