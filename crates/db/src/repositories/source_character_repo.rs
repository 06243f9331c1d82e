//! Reads character snapshots from the source (game) store.
//!
//! The source schema is owned by the game server and varies between
//! deployments, so the optional point counters are probed before every
//! extraction and substituted with zero when absent.

use sqlx::PgPool;

use crate::models::character::CharacterSnapshot;

/// Source table holding playable characters.
pub const SOURCE_TABLE: &str = "characters";

/// Columns the extractor cannot work without.
pub const REQUIRED_COLUMNS: [&str; 6] = ["name", "job", "level", "fame", "meso", "gm"];

/// Which optional counters exist in the source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceColumns {
    pub dog_points: bool,
    pub fish_points: bool,
}

impl SourceColumns {
    /// Resolve the column layout from the names present in the source
    /// table. Returns the missing required columns on failure.
    pub fn resolve(present: &[String]) -> Result<Self, Vec<&'static str>> {
        let has = |col: &str| present.iter().any(|p| p.eq_ignore_ascii_case(col));

        let missing: Vec<&'static str> = REQUIRED_COLUMNS
            .into_iter()
            .filter(|col| !has(*col))
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(Self {
            dog_points: has("dog_points"),
            fish_points: has("fish_points"),
        })
    }

    fn select_list(&self) -> String {
        let counter = |present: bool, col: &str| {
            if present {
                format!("COALESCE({col}, 0)::INTEGER AS {col}")
            } else {
                format!("0::INTEGER AS {col}")
            }
        };
        format!(
            "name::TEXT AS name, \
             COALESCE(job, 0)::INTEGER AS job, \
             COALESCE(level, 0)::INTEGER AS level, \
             COALESCE(fame, 0)::INTEGER AS fame, \
             COALESCE(meso, 0)::BIGINT AS meso, \
             {}, {}",
            counter(self.dog_points, "dog_points"),
            counter(self.fish_points, "fish_points"),
        )
    }
}

/// Provides read-only queries against the source `characters` table.
pub struct SourceCharacterRepo;

impl SourceCharacterRepo {
    /// Column names currently present in the source table.
    pub async fn present_columns(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        super::SchemaRepo::column_order(pool, SOURCE_TABLE).await
    }

    /// Select up to `limit` non-GM characters, highest level first.
    pub async fn extract(
        pool: &PgPool,
        columns: SourceColumns,
        limit: i64,
    ) -> Result<Vec<CharacterSnapshot>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM {SOURCE_TABLE} \
             WHERE name IS NOT NULL AND COALESCE(gm::INTEGER, 0) = 0 \
             ORDER BY level DESC, name ASC \
             LIMIT $1",
            columns.select_list()
        );
        sqlx::query_as::<_, CharacterSnapshot>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
