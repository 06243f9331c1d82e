//! Online-session probe against the source store.

use sqlx::PgPool;

/// Provides login-state queries against the source `accounts` table.
pub struct SessionRepo;

impl SessionRepo {
    /// Count distinct logged-in accounts that own at least one non-GM
    /// character.
    pub async fn count_online(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT a.id) \
             FROM accounts a \
             JOIN characters ch ON ch.accountid = a.id \
             WHERE a.loggedin > 0 \
               AND COALESCE(ch.gm::INTEGER, 0) = 0",
        )
        .fetch_one(pool)
        .await
    }
}
