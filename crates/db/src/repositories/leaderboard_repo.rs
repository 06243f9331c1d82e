//! Repository for the derived `leaderboard_snapshot` table.

use rankmirror_core::leaderboard::{LeaderboardQuery, RankingType};
use sqlx::PgPool;

use crate::models::character::CharacterSnapshot;

/// Column list for `leaderboard_snapshot` SELECT and INSERT statements.
const COLUMNS: &str = "name, job, level, fame, meso, dog_points, fish_points";

/// Number of bound parameters per inserted row.
const PARAMS_PER_ROW: usize = 7;

/// Serialises concurrent replacers so the last commit wins cleanly.
const REPLACE_LOCK_KEY: i64 = 0x726b_6d72_0002;

/// Fixed ORDER BY clause for each ranking type.
pub fn order_clause(ranking: RankingType) -> &'static str {
    match ranking {
        RankingType::Level => "level DESC, name ASC",
        RankingType::Fame => "fame DESC, level DESC, name ASC",
        RankingType::Currency => "meso DESC, level DESC, name ASC",
        RankingType::Aux1 => "dog_points DESC, level DESC, name ASC",
        RankingType::Aux2 => "fish_points DESC, level DESC, name ASC",
    }
}

/// Escape LIKE wildcards so a name filter matches literally.
pub fn like_pattern(filter: &str) -> String {
    let mut escaped = String::with_capacity(filter.len() + 2);
    escaped.push('%');
    for ch in filter.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Provides query operations for the leaderboard snapshot.
pub struct LeaderboardRepo;

impl LeaderboardRepo {
    /// Replace the whole table with `rows` in one transaction.
    ///
    /// Readers keep seeing the previous snapshot until commit, then the new
    /// one; there is no visible empty state. Returns the number of rows
    /// written. Duplicate names within `rows` keep the first occurrence.
    pub async fn replace_all(
        pool: &PgPool,
        rows: &[CharacterSnapshot],
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(REPLACE_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        // DELETE rather than TRUNCATE: TRUNCATE takes an exclusive lock that
        // blocks concurrent readers for the whole transaction.
        sqlx::query("DELETE FROM leaderboard_snapshot")
            .execute(&mut *tx)
            .await?;

        let mut written = 0u64;
        if !rows.is_empty() {
            let mut query = format!("INSERT INTO leaderboard_snapshot ({COLUMNS}) VALUES ");

            let mut param_idx = 1usize;
            for (i, _) in rows.iter().enumerate() {
                if i > 0 {
                    query.push_str(", ");
                }
                query.push('(');
                for j in 0..PARAMS_PER_ROW {
                    if j > 0 {
                        query.push_str(", ");
                    }
                    query.push('$');
                    query.push_str(&param_idx.to_string());
                    param_idx += 1;
                }
                query.push(')');
            }
            query.push_str(" ON CONFLICT (name) DO NOTHING");

            let mut q = sqlx::query(&query);
            for r in rows {
                q = q
                    .bind(&r.name)
                    .bind(r.job)
                    .bind(r.level)
                    .bind(r.fame)
                    .bind(r.meso)
                    .bind(r.dog_points)
                    .bind(r.fish_points);
            }

            written = q.execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    /// Fetch one ranked page.
    pub async fn fetch_page(
        pool: &PgPool,
        query: &LeaderboardQuery,
    ) -> Result<Vec<CharacterSnapshot>, sqlx::Error> {
        let order = order_clause(query.ranking);

        match &query.name_filter {
            Some(filter) => {
                let sql = format!(
                    "SELECT {COLUMNS} FROM leaderboard_snapshot \
                     WHERE name ILIKE $1 ESCAPE '\\' \
                     ORDER BY {order} \
                     LIMIT $2"
                );
                sqlx::query_as::<_, CharacterSnapshot>(&sql)
                    .bind(like_pattern(filter))
                    .bind(query.limit)
                    .fetch_all(pool)
                    .await
            }
            None => {
                let sql = format!(
                    "SELECT {COLUMNS} FROM leaderboard_snapshot \
                     ORDER BY {order} \
                     LIMIT $1"
                );
                sqlx::query_as::<_, CharacterSnapshot>(&sql)
                    .bind(query.limit)
                    .fetch_all(pool)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_ranking_has_a_fixed_order_clause() {
        for ranking in RankingType::ALL {
            assert!(order_clause(ranking).ends_with("name ASC"));
        }
        assert!(order_clause(RankingType::Currency).starts_with("meso DESC"));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ab"), "%ab%");
        assert_eq!(like_pattern("a_b%"), "%a\\_b\\%%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
