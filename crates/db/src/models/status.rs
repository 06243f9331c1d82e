//! The single server status row.

use rankmirror_core::status::StatusRecord;
use rankmirror_core::types::Timestamp;
use sqlx::FromRow;

/// Fixed primary key of the only status row.
pub const STATUS_ROW_ID: i16 = 1;

/// `updated_at` of the seeded row before any publisher has written it.
/// Any real publish is newer, whatever clock stamped it.
pub const UNSET_UPDATED_AT: Timestamp = Timestamp::UNIX_EPOCH;

#[derive(Debug, Clone, FromRow)]
pub struct ServerStatusRow {
    pub is_online: bool,
    pub online_count: i32,
    pub updated_at: Timestamp,
}

impl From<ServerStatusRow> for StatusRecord {
    fn from(row: ServerStatusRow) -> Self {
        StatusRecord {
            is_online: row.is_online,
            online_count: i64::from(row.online_count),
            updated_at: row.updated_at,
        }
    }
}
