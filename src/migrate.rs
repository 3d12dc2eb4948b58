use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // Notification records. source_id carries the uniqueness constraint that
    // backs the store's idempotence guarantee; the application-level
    // existence check is only an optimization on top of it.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            source_id TEXT NOT NULL UNIQUE,
            content_hash TEXT,
            process_number TEXT,
            court TEXT,
            organ TEXT,
            communication_type TEXT,
            published_at TEXT,
            body TEXT NOT NULL,
            raw_json TEXT NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            status TEXT NOT NULL DEFAULT 'extracted',
            extracted_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Cycle log entries, one per extraction run.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cycle_logs (
            id TEXT PRIMARY KEY,
            started_at INTEGER NOT NULL,
            finished_at INTEGER,
            status TEXT NOT NULL,
            found INTEGER NOT NULL DEFAULT 0,
            inserted INTEGER NOT NULL DEFAULT 0,
            duplicates INTEGER NOT NULL DEFAULT 0,
            errors INTEGER NOT NULL DEFAULT 0,
            elapsed_secs INTEGER NOT NULL DEFAULT 0,
            date_from TEXT,
            date_to TEXT,
            error TEXT,
            error_details TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_notifications_content_hash ON notifications(content_hash)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_notifications_published_at ON notifications(published_at)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_notifications_court ON notifications(court)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_cycle_logs_started_at ON cycle_logs(started_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
