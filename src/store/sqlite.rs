//! SQLite checkpoint store: one row per session, replaced on every save.

use std::path::Path;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::instrument;

use super::CheckpointStore;
use crate::error::StoreError;
use crate::types::{Checkpoint, SessionId};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS checkpoints (
  session_id TEXT PRIMARY KEY,
  step INTEGER NOT NULL,
  body TEXT NOT NULL,
  updated_at TEXT NOT NULL
)";

#[derive(Debug, Clone)]
pub struct SqliteCheckpointStore {
  pool: SqlitePool,
}

impl SqliteCheckpointStore {
  /// Opens (creating if needed) the database file at `path`.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(parent).await?;
    }
    let options = SqliteConnectOptions::new()
      .filename(path)
      .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
      .max_connections(4)
      .connect_with(options)
      .await?;
    Self::from_pool(pool).await
  }

  pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
    sqlx::query(CREATE_TABLE).execute(&pool).await?;
    Ok(Self { pool })
  }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
  #[instrument(level = "trace", skip(self, checkpoint))]
  async fn save(&self, session_id: &SessionId, checkpoint: &Checkpoint) -> Result<(), StoreError> {
    let body = serde_json::to_string(checkpoint)?;
    sqlx::query(
      "INSERT INTO checkpoints (session_id, step, body, updated_at) VALUES (?, ?, ?, ?)
       ON CONFLICT(session_id) DO UPDATE SET step = excluded.step, body = excluded.body, updated_at = excluded.updated_at",
    )
    .bind(session_id.as_str())
    .bind(i64::try_from(checkpoint.step).unwrap_or(i64::MAX))
    .bind(body)
    .bind(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  #[instrument(level = "trace", skip(self))]
  async fn load(&self, session_id: &SessionId) -> Result<Option<Checkpoint>, StoreError> {
    let row = sqlx::query("SELECT body FROM checkpoints WHERE session_id = ?")
      .bind(session_id.as_str())
      .fetch_optional(&self.pool)
      .await?;
    match row {
      Some(row) => {
        let body: String = row.try_get("body")?;
        Ok(Some(serde_json::from_str(&body)?))
      }
      None => Ok(None),
    }
  }
}
