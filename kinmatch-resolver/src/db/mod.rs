//! Database access for kinmatch-resolver
//!
//! Shared SQLite database holding the rejection ledger.

pub mod rejections;

pub use rejections::{RejectionEntry, RejectionLedger};

use kinmatch_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Creates the parent directory and the database file when missing.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create resolver tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rejections (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            owner TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            candidate_id TEXT NOT NULL,
            pair_hash TEXT NOT NULL,
            reason TEXT,
            candidate TEXT,
            rejected_at TEXT NOT NULL,
            UNIQUE(owner, pair_hash),
            UNIQUE(owner, subject_id, candidate_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_rejections_owner_subject ON rejections(owner, subject_id)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (rejections)");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_database_pool_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("kinmatch.db");

        let pool = init_database_pool(&path).await.unwrap();
        assert!(path.exists());

        // Idempotent
        init_tables(&pool).await.unwrap();
    }
}
