//! PostgreSQL-backed tests for the repositories and store implementations.
//!
//! Each test gets a fresh database from `#[sqlx::test]`, which needs a
//! reachable server in `DATABASE_URL`.

use assert_matches::assert_matches;
use chrono::Utc;
use rankmirror_core::leaderboard::{LeaderboardQuery, RankingType};
use rankmirror_db::models::character::CharacterSnapshot;
use rankmirror_db::repositories::schema_repo::{LEADERBOARD_TABLE, STATUS_TABLE};
use rankmirror_db::repositories::{LeaderboardRepo, SchemaRepo, ServerStatusRepo};
use rankmirror_db::{CacheStore, PgCacheStore, PgSourceStore, SourceStore, StoreError};
use sqlx::PgPool;

fn snapshot(name: &str, level: i32, meso: i64) -> CharacterSnapshot {
    CharacterSnapshot {
        name: name.to_string(),
        job: 100,
        level,
        fame: 0,
        meso,
        dog_points: 0,
        fish_points: 0,
    }
}

async fn row_count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn create_source_schema(pool: &PgPool, with_dog_points: bool) {
    let dog = if with_dog_points { ", dog_points INTEGER" } else { "" };
    sqlx::query(&format!(
        "CREATE TABLE characters ( \
            id BIGSERIAL PRIMARY KEY, accountid BIGINT NOT NULL, name TEXT NOT NULL, \
            job INTEGER, level INTEGER, fame INTEGER, meso BIGINT, gm SMALLINT{dog})"
    ))
    .execute(pool)
    .await
    .unwrap();
    sqlx::query("CREATE TABLE accounts (id BIGINT PRIMARY KEY, loggedin SMALLINT NOT NULL)")
        .execute(pool)
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Schema reconciliation
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn reconcile_is_idempotent_and_seeds_status(pool: PgPool) {
    let first = SchemaRepo::reconcile(&pool).await.unwrap();
    assert!(first.columns_added.is_empty());
    assert!(first.keys_added.is_empty());
    assert!(first.canonical_order);

    let second = SchemaRepo::reconcile(&pool).await.unwrap();
    assert_eq!(second, first);

    // The seeded row exists but reads as never published.
    assert_eq!(row_count(&pool, STATUS_TABLE).await, 1);
    assert!(ServerStatusRepo::get(&pool).await.unwrap().is_none());
}

#[sqlx::test]
async fn reconcile_keys_tables_created_without_unique_columns(pool: PgPool) {
    sqlx::query("CREATE TABLE leaderboard_snapshot (name TEXT NOT NULL, level INTEGER)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO leaderboard_snapshot (name, level) VALUES ('dup', 1), ('dup', 2)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "CREATE TABLE server_status (id SMALLINT NOT NULL, is_online BOOLEAN NOT NULL, \
         online_count INTEGER NOT NULL, updated_at TIMESTAMPTZ NOT NULL)",
    )
    .execute(&pool)
    .await
    .unwrap();

    let report = SchemaRepo::reconcile(&pool).await.unwrap();
    assert_eq!(
        report.keys_added,
        vec!["uq_leaderboard_snapshot_name", "uq_server_status_id"]
    );
    assert_eq!(row_count(&pool, LEADERBOARD_TABLE).await, 1);

    let again = SchemaRepo::reconcile(&pool).await.unwrap();
    assert!(again.keys_added.is_empty());

    let written = LeaderboardRepo::replace_all(&pool, &[snapshot("a", 10, 1), snapshot("b", 20, 2)])
        .await
        .unwrap();
    assert_eq!(written, 2);
    assert_eq!(row_count(&pool, LEADERBOARD_TABLE).await, 2);

    assert!(ServerStatusRepo::upsert(&pool, true, 3, Utc::now()).await.unwrap());
    assert_eq!(row_count(&pool, STATUS_TABLE).await, 1);
    assert_eq!(ServerStatusRepo::get(&pool).await.unwrap().unwrap().online_count, 3);
}

#[sqlx::test]
async fn reconcile_adds_missing_columns_and_widens_currency(pool: PgPool) {
    sqlx::query(
        "CREATE TABLE leaderboard_snapshot (name TEXT PRIMARY KEY, level INTEGER, meso INTEGER)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO leaderboard_snapshot (name, level, meso) VALUES ('kept', 5, 7)")
        .execute(&pool)
        .await
        .unwrap();

    let report = SchemaRepo::reconcile(&pool).await.unwrap();
    assert_eq!(
        report.columns_added,
        vec!["job", "fame", "dog_points", "fish_points"]
    );
    assert!(report.widened_currency);
    assert!(!report.canonical_order);

    let order = SchemaRepo::column_order(&pool, LEADERBOARD_TABLE).await.unwrap();
    assert_eq!(order.len(), 7);
    assert_eq!(row_count(&pool, LEADERBOARD_TABLE).await, 1);
}

// ---------------------------------------------------------------------------
// Replace + read
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn replace_leaves_exactly_the_new_rows(pool: PgPool) {
    let cache = PgCacheStore::new(pool.clone());
    cache.reconcile().await.unwrap();

    cache
        .replace_snapshot(&[snapshot("old", 1, 1)])
        .await
        .unwrap();
    let rows = vec![
        snapshot("a", 80, 10),
        snapshot("b", 95, 5_000_000_000),
        snapshot("c", 40, 20),
    ];
    let written = cache.replace_snapshot(&rows).await.unwrap();
    assert_eq!(written, 3);
    assert_eq!(row_count(&pool, LEADERBOARD_TABLE).await, 3);

    let page = cache
        .fetch_leaderboard(&LeaderboardQuery {
            ranking: RankingType::Currency,
            name_filter: None,
            limit: 10,
        })
        .await
        .unwrap();
    assert_eq!(page[0].name, "b");
    assert_eq!(page[0].meso, 5_000_000_000);
}

#[sqlx::test]
async fn name_filter_matches_wildcards_literally(pool: PgPool) {
    let cache = PgCacheStore::new(pool.clone());
    cache.reconcile().await.unwrap();
    cache
        .replace_snapshot(&[snapshot("Ali_ce", 10, 0), snapshot("Alixce", 20, 0)])
        .await
        .unwrap();

    let page = cache
        .fetch_leaderboard(&LeaderboardQuery {
            ranking: RankingType::Level,
            name_filter: Some("i_c".to_string()),
            limit: 10,
        })
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].name, "Ali_ce");
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn status_upsert_ignores_older_writes(pool: PgPool) {
    SchemaRepo::reconcile(&pool).await.unwrap();
    let now = Utc::now() + chrono::Duration::seconds(5);

    assert!(ServerStatusRepo::upsert(&pool, true, 12, now).await.unwrap());
    let earlier = now - chrono::Duration::seconds(30);
    assert!(!ServerStatusRepo::upsert(&pool, false, 0, earlier).await.unwrap());

    let status = ServerStatusRepo::get(&pool).await.unwrap().unwrap();
    assert!(status.is_online);
    assert_eq!(status.online_count, 12);
}

#[sqlx::test]
async fn first_publish_wins_over_seed_with_app_clock_behind(pool: PgPool) {
    SchemaRepo::reconcile(&pool).await.unwrap();
    let behind = Utc::now() - chrono::Duration::seconds(1);

    assert!(ServerStatusRepo::upsert(&pool, true, 4, behind).await.unwrap());
    let status = ServerStatusRepo::get(&pool).await.unwrap().unwrap();
    assert!(status.is_online);
    assert_eq!(status.updated_at.timestamp(), behind.timestamp());
}

// ---------------------------------------------------------------------------
// Source store
// ---------------------------------------------------------------------------

#[sqlx::test]
async fn extract_excludes_gms_and_defaults_missing_counters(pool: PgPool) {
    create_source_schema(&pool, false).await;
    sqlx::query(
        "INSERT INTO characters (accountid, name, job, level, fame, meso, gm) VALUES \
         (1, 'a', 100, 80, 1, 10, 0), (2, 'b', 200, 95, 2, 20, NULL), \
         (3, 'c', 300, 40, 3, 30, 0), (4, 'gm', 900, 200, 0, 0, 1)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO accounts (id, loggedin) VALUES (1, 1), (2, 0), (3, 2), (4, 1)")
        .execute(&pool)
        .await
        .unwrap();

    let source = PgSourceStore::new(pool.clone());
    let rows = source.extract(200).await.unwrap();
    let levels: Vec<i32> = rows.iter().map(|r| r.level).collect();
    assert_eq!(levels, vec![95, 80, 40]);
    assert!(rows.iter().all(|r| r.dog_points == 0 && r.fish_points == 0));

    assert_eq!(source.count_online().await.unwrap(), 2);
}

#[sqlx::test]
async fn extract_reports_schema_mismatch(pool: PgPool) {
    sqlx::query("CREATE TABLE characters (name TEXT, level INTEGER)")
        .execute(&pool)
        .await
        .unwrap();

    let err = PgSourceStore::new(pool).extract(200).await.unwrap_err();
    assert_matches!(err, StoreError::MissingColumns { table: "characters", .. });
}
