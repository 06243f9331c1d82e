//! Idempotent reconciliation of the cache store schema.
//!
//! Creates the derived leaderboard table and the status table when absent,
//! adds any missing columns, ensures the unique keys the writers conflict on,
//! widens the currency column to BIGINT and seeds the status row. Never drops
//! data except rows that duplicate a conflict key.

use sqlx::{PgExecutor, PgPool};

use crate::models::status::{STATUS_ROW_ID, UNSET_UPDATED_AT};

/// Derived leaderboard table name.
pub const LEADERBOARD_TABLE: &str = "leaderboard_snapshot";

/// Status table name.
pub const STATUS_TABLE: &str = "server_status";

/// Canonical column order of the leaderboard table, with column DDL.
pub const LEADERBOARD_COLUMNS: [(&str, &str); 7] = [
    ("name", "TEXT NOT NULL"),
    ("job", "INTEGER NOT NULL DEFAULT 0"),
    ("level", "INTEGER NOT NULL DEFAULT 0"),
    ("fame", "INTEGER NOT NULL DEFAULT 0"),
    ("meso", "BIGINT NOT NULL DEFAULT 0"),
    ("dog_points", "INTEGER NOT NULL DEFAULT 0"),
    ("fish_points", "INTEGER NOT NULL DEFAULT 0"),
];

/// Serialises concurrent reconcilers (e.g. two processes starting at once).
const RECONCILE_LOCK_KEY: i64 = 0x726b_6d72_0001;

const CREATE_LEADERBOARD: &str = "\
    CREATE TABLE IF NOT EXISTS leaderboard_snapshot ( \
        name TEXT PRIMARY KEY, \
        job INTEGER NOT NULL DEFAULT 0, \
        level INTEGER NOT NULL DEFAULT 0, \
        fame INTEGER NOT NULL DEFAULT 0, \
        meso BIGINT NOT NULL DEFAULT 0, \
        dog_points INTEGER NOT NULL DEFAULT 0, \
        fish_points INTEGER NOT NULL DEFAULT 0 \
    )";

const CREATE_STATUS: &str = "\
    CREATE TABLE IF NOT EXISTS server_status ( \
        id SMALLINT PRIMARY KEY, \
        is_online BOOLEAN NOT NULL DEFAULT FALSE, \
        online_count INTEGER NOT NULL DEFAULT 0, \
        updated_at TIMESTAMPTZ NOT NULL DEFAULT TIMESTAMPTZ 'epoch', \
        CONSTRAINT ck_server_status_single_row CHECK (id = 1) \
    )";

/// A unique key targeted by `ON CONFLICT` in the replacer or status writer.
/// Tables created here already carry it as the primary key; tables that
/// predate reconciliation may not.
struct UniqueKey {
    table: &'static str,
    column: &'static str,
    index: &'static str,
}

const UNIQUE_KEYS: [UniqueKey; 2] = [
    UniqueKey {
        table: LEADERBOARD_TABLE,
        column: "name",
        index: "uq_leaderboard_snapshot_name",
    },
    UniqueKey {
        table: STATUS_TABLE,
        column: "id",
        index: "uq_server_status_id",
    },
];

/// What a reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Columns that were missing and have been added.
    pub columns_added: Vec<&'static str>,
    /// Unique indexes created on tables that lacked a conflict key.
    pub keys_added: Vec<&'static str>,
    /// Whether the currency column was widened to BIGINT.
    pub widened_currency: bool,
    /// Whether the leaderboard columns appear in canonical order.
    pub canonical_order: bool,
}

/// Provides schema reconciliation for the cache store.
pub struct SchemaRepo;

impl SchemaRepo {
    /// Bring the cache schema up to date. Safe to call repeatedly.
    ///
    /// All DDL runs in one transaction under an advisory lock, so concurrent
    /// callers apply their changes one after the other.
    pub async fn reconcile(pool: &PgPool) -> Result<ReconcileReport, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(RECONCILE_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        sqlx::query(CREATE_LEADERBOARD).execute(&mut *tx).await?;
        sqlx::query(CREATE_STATUS).execute(&mut *tx).await?;

        let existing = Self::column_order(&mut *tx, LEADERBOARD_TABLE).await?;
        let mut report = ReconcileReport::default();

        for (column, ddl) in LEADERBOARD_COLUMNS {
            if existing.iter().any(|c| c == column) {
                continue;
            }
            let alter =
                format!("ALTER TABLE {LEADERBOARD_TABLE} ADD COLUMN IF NOT EXISTS {column} {ddl}");
            sqlx::query(&alter).execute(&mut *tx).await?;
            report.columns_added.push(column);
        }

        let meso_type: Option<String> = sqlx::query_scalar(
            "SELECT data_type::TEXT FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 AND column_name = 'meso'",
        )
        .bind(LEADERBOARD_TABLE)
        .fetch_optional(&mut *tx)
        .await?;

        if matches!(meso_type.as_deref(), Some("integer" | "smallint")) {
            sqlx::query("ALTER TABLE leaderboard_snapshot ALTER COLUMN meso TYPE BIGINT")
                .execute(&mut *tx)
                .await?;
            report.widened_currency = true;
        }

        for key in UNIQUE_KEYS {
            if Self::has_unique_key(&mut *tx, key.table, key.column).await? {
                continue;
            }
            let (table, column, index) = (key.table, key.column, key.index);
            let dedupe = format!(
                "DELETE FROM {table} a USING {table} b \
                 WHERE a.{column} = b.{column} AND a.ctid < b.ctid"
            );
            sqlx::query(&dedupe).execute(&mut *tx).await?;
            let create = format!("CREATE UNIQUE INDEX IF NOT EXISTS {index} ON {table} ({column})");
            sqlx::query(&create).execute(&mut *tx).await?;
            report.keys_added.push(index);
        }

        sqlx::query(
            "INSERT INTO server_status (id, is_online, online_count, updated_at) \
             VALUES ($1, FALSE, 0, $2) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(STATUS_ROW_ID)
        .bind(UNSET_UPDATED_AT)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let order = Self::column_order(pool, LEADERBOARD_TABLE).await?;
        report.canonical_order = is_canonical_order(&order);

        Ok(report)
    }

    /// Whether `table` has a single-column unique index (or primary key) on `column`.
    pub async fn has_unique_key<'e>(
        executor: impl PgExecutor<'e>,
        table: &str,
        column: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM pg_index i \
                 JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = i.indkey[0] \
                 WHERE i.indrelid = to_regclass($1) AND i.indisunique \
                   AND i.indnkeyatts = 1 AND a.attname = $2 \
             )",
        )
        .bind(table)
        .bind(column)
        .fetch_one(executor)
        .await
    }

    /// Column names of `table` in physical order.
    pub async fn column_order<'e>(
        executor: impl PgExecutor<'e>,
        table: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT column_name::TEXT FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 \
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(executor)
        .await
    }
}

/// Whether the known leaderboard columns appear in canonical relative order.
/// Extra columns are ignored.
pub fn is_canonical_order(order: &[String]) -> bool {
    let known: Vec<&str> = order
        .iter()
        .map(String::as_str)
        .filter(|c| LEADERBOARD_COLUMNS.iter().any(|(k, _)| k == c))
        .collect();
    let canonical: Vec<&str> = LEADERBOARD_COLUMNS.iter().map(|(c, _)| *c).collect();
    known == canonical
}
