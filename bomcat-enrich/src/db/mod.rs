//! Database access for the enrichment service
//!
//! All tables live in a single SQLite file shared with the catalog. Audit
//! tables are append-mostly; the daily rollup is the only table that gets
//! rewritten in place.

pub mod audit;
pub mod catalog;
pub mod queue;

use bomcat_common::Result;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Initialize database connection pool and create tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    // Comparison rows cascade-delete with their run, so FK enforcement
    // must be on for every pooled connection
    let options = SqliteConnectOptions::from_str(&db_url)
        .map_err(sqlx::Error::from)?
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// In-memory pool for tests
///
/// Pinned to a single connection that never recycles: every connection to
/// `sqlite::memory:` is a separate empty database.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(sqlx::Error::from)?
        .foreign_keys(true);
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Create enrichment tables if they don't exist
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    // Production catalog: one row per mpn
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS catalog_components (
            id TEXT PRIMARY KEY,
            mpn TEXT NOT NULL UNIQUE,
            manufacturer TEXT,
            category TEXT,
            description TEXT,
            datasheet_url TEXT,
            image_url TEXT,
            lifecycle TEXT NOT NULL DEFAULT 'unknown',
            rohs INTEGER,
            reach INTEGER,
            specifications TEXT NOT NULL DEFAULT '{}',
            pricing TEXT NOT NULL DEFAULT '[]',
            quality_score REAL NOT NULL DEFAULT 0.0,
            enrichment_source TEXT NOT NULL,
            last_enriched_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Review queue: mid-band candidates awaiting a human decision
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS review_queue (
            id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL,
            job_id TEXT NOT NULL,
            line_id TEXT NOT NULL UNIQUE,
            mpn TEXT NOT NULL,
            manufacturer TEXT,
            quality_score REAL NOT NULL,
            candidate TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'needs_review',
            created_at TEXT NOT NULL,
            reviewed_by TEXT,
            reviewed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One audit run per enrichment attempt
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS enrichment_runs (
            id TEXT PRIMARY KEY,
            job_id TEXT NOT NULL,
            line_id TEXT NOT NULL,
            mpn TEXT NOT NULL,
            manufacturer TEXT,
            timestamp TEXT NOT NULL,
            successful INTEGER NOT NULL,
            quality_score REAL NOT NULL,
            storage_location TEXT NOT NULL,
            supplier_name TEXT,
            supplier_match_confidence REAL,
            processing_time_ms INTEGER NOT NULL,
            error_message TEXT,
            tier_reached INTEGER NOT NULL,
            needs_review INTEGER NOT NULL DEFAULT 0,
            reviewed_by TEXT,
            reviewed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_enrichment_runs_job ON enrichment_runs(job_id)",
    )
    .execute(pool)
    .await?;

    // Field-level comparison rows, cascade-deleted with their run
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS field_comparisons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id TEXT NOT NULL REFERENCES enrichment_runs(id) ON DELETE CASCADE,
            field_name TEXT NOT NULL,
            field_category TEXT NOT NULL,
            supplier_value TEXT,
            normalized_value TEXT,
            changed INTEGER NOT NULL,
            change_type TEXT NOT NULL,
            change_reason TEXT,
            confidence REAL NOT NULL,
            supplier_data_quality TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_field_comparisons_run ON field_comparisons(run_id)",
    )
    .execute(pool)
    .await?;

    // Daily per-supplier rollup, recomputed idempotently
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS supplier_quality_daily (
            date TEXT NOT NULL,
            supplier_name TEXT NOT NULL,
            total_runs INTEGER NOT NULL,
            successful_runs INTEGER NOT NULL,
            failed_runs INTEGER NOT NULL,
            avg_quality_score REAL NOT NULL,
            avg_match_confidence REAL NOT NULL,
            avg_processing_time_ms REAL NOT NULL,
            invalid_field_count INTEGER NOT NULL,
            missing_field_count INTEGER NOT NULL,
            UNIQUE(date, supplier_name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!(
        "Database tables initialized (catalog_components, review_queue, enrichment_runs, field_comparisons, supplier_quality_daily)"
    );

    Ok(())
}
