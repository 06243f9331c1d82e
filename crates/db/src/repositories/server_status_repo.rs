//! Repository for the single-row `server_status` table.

use rankmirror_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::status::{ServerStatusRow, STATUS_ROW_ID, UNSET_UPDATED_AT};

/// Provides upsert and read for the server status row.
pub struct ServerStatusRepo;

impl ServerStatusRepo {
    /// Upsert the status row.
    ///
    /// A write stamped earlier than the stored `updated_at` is ignored, so
    /// overlapping writers resolve by real time rather than arrival order.
    /// Returns whether the row was written.
    pub async fn upsert(
        pool: &PgPool,
        is_online: bool,
        online_count: i64,
        updated_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let count = i32::try_from(online_count.max(0)).unwrap_or(i32::MAX);
        let result = sqlx::query(
            "INSERT INTO server_status (id, is_online, online_count, updated_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET \
                 is_online = EXCLUDED.is_online, \
                 online_count = EXCLUDED.online_count, \
                 updated_at = EXCLUDED.updated_at \
             WHERE server_status.updated_at <= EXCLUDED.updated_at",
        )
        .bind(STATUS_ROW_ID)
        .bind(is_online)
        .bind(count)
        .bind(updated_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Read the status row, if a publisher has written it.
    pub async fn get(pool: &PgPool) -> Result<Option<ServerStatusRow>, sqlx::Error> {
        sqlx::query_as::<_, ServerStatusRow>(
            "SELECT is_online, online_count, updated_at FROM server_status \
             WHERE id = $1 AND updated_at > $2",
        )
        .bind(STATUS_ROW_ID)
        .bind(UNSET_UPDATED_AT)
        .fetch_optional(pool)
        .await
    }
}
