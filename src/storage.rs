//! Persistent per-user greeting state, backed by a single SQLite table.
//!
//! One row per user keyed by Telegram user ID. The schema is created on open,
//! so a first run against a fresh database file needs no external migration
//! step. All access goes through full-record reads and single-row upserts:
//! the engine always recomputes the whole record, so partial column updates
//! would only add write paths to get wrong.

use crate::greeting::record::{GreetingRecord, Stage};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors from the greeting store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The underlying database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A storage call exceeded its time budget.
    #[error("storage operation timed out")]
    Timeout,
    /// A stored stage value does not name a known conversation stage.
    #[error("stored stage {0} is not a known conversation stage")]
    InvalidStage(i64),
}

/// SQLite-backed store of [`GreetingRecord`]s.
pub struct GreetingStore {
    pool: Pool<Sqlite>,
}

impl GreetingStore {
    /// Opens (creating if needed) the database at `path` and ensures the
    /// schema exists.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` if the database cannot be opened or the
    /// schema cannot be created.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        let db_url = format!("sqlite://{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        info!("Greeting store ready at {}.", path.display());
        Ok(store)
    }

    /// Opens an in-memory store, used by tests.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` if the schema cannot be created.
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        // Each SQLite :memory: connection is its own database, so the pool
        // must be pinned to one connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY,
                last_greeted_at INTEGER NOT NULL DEFAULT 0,
                stage INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetches the record for `user_id`, or `None` if the bot has never
    /// greeted them.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` on database failure or if the stored stage
    /// value is unknown.
    pub async fn get(&self, user_id: i64) -> Result<Option<GreetingRecord>, StorageError> {
        let row = sqlx::query("SELECT user_id, last_greeted_at, stage FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let stage_raw: i64 = row.try_get("stage")?;
        let stage = Stage::from_i64(stage_raw).ok_or(StorageError::InvalidStage(stage_raw))?;
        Ok(Some(GreetingRecord {
            user_id: row.try_get("user_id")?,
            last_greeted_at: row.try_get("last_greeted_at")?,
            stage,
        }))
    }

    /// Writes the full record, inserting the row on first contact and
    /// replacing it afterwards.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` on database failure.
    pub async fn upsert(&self, record: &GreetingRecord) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO users (user_id, last_greeted_at, stage) VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                 last_greeted_at = excluded.last_greeted_at,
                 stage = excluded.stage",
        )
        .bind(record.user_id)
        .bind(record.last_greeted_at)
        .bind(record.stage.as_i64())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_absent_user_returns_none() -> Result<(), StorageError> {
        let store = GreetingStore::open_in_memory().await?;
        assert_eq!(store.get(42).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_then_get_roundtrip() -> Result<(), StorageError> {
        let store = GreetingStore::open_in_memory().await?;
        let record = GreetingRecord {
            user_id: 42,
            last_greeted_at: 1_000,
            stage: Stage::Fresh,
        };
        store.upsert(&record).await?;
        assert_eq!(store.get(42).await?, Some(record));
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_replaces_the_existing_row() -> Result<(), StorageError> {
        let store = GreetingStore::open_in_memory().await?;
        store
            .upsert(&GreetingRecord {
                user_id: 42,
                last_greeted_at: 1_000,
                stage: Stage::Fresh,
            })
            .await?;
        let later = GreetingRecord {
            user_id: 42,
            last_greeted_at: 9_000,
            stage: Stage::Exhausted,
        };
        store.upsert(&later).await?;
        assert_eq!(store.get(42).await?, Some(later));
        Ok(())
    }

    #[tokio::test]
    async fn test_records_are_keyed_per_user() -> Result<(), StorageError> {
        let store = GreetingStore::open_in_memory().await?;
        let first = GreetingRecord {
            user_id: 1,
            last_greeted_at: 100,
            stage: Stage::Affirmed,
        };
        let second = GreetingRecord {
            user_id: 2,
            last_greeted_at: 200,
            stage: Stage::Fresh,
        };
        store.upsert(&first).await?;
        store.upsert(&second).await?;
        assert_eq!(store.get(1).await?, Some(first));
        assert_eq!(store.get(2).await?, Some(second));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_stored_stage_is_an_error() -> Result<(), StorageError> {
        let store = GreetingStore::open_in_memory().await?;
        sqlx::query("INSERT INTO users (user_id, last_greeted_at, stage) VALUES (1, 5, 9)")
            .execute(&store.pool)
            .await?;

        let err = store.get(1).await.expect_err("stage 9 must not parse");
        assert!(matches!(err, StorageError::InvalidStage(9)));
        Ok(())
    }
}
