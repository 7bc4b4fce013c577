//! SQLite-backed metadata log.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::instrument;

use super::{MetadataLog, MetadataRecord};
use crate::error::{ProviderError, StoreError};
use crate::types::SessionId;

const LOG: &str = "metadata_log";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS metadata_log (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  session_id TEXT NOT NULL UNIQUE,
  topic TEXT NOT NULL,
  published_at TEXT NOT NULL
)";

/// Published-article log in a SQLite table.
#[derive(Debug, Clone)]
pub struct SqliteMetadataLog {
  pool: SqlitePool,
}

impl SqliteMetadataLog {
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

  /// Uses an existing pool; creates the table if missing.
  pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
    sqlx::query(CREATE_TABLE).execute(&pool).await?;
    Ok(Self { pool })
  }
}

fn db_error(e: sqlx::Error) -> ProviderError {
  ProviderError::permanent(LOG, e.to_string())
}

#[async_trait]
impl MetadataLog for SqliteMetadataLog {
  #[instrument(level = "trace", skip(self, timestamp))]
  async fn append(
    &self,
    session_id: &SessionId,
    topic: &str,
    timestamp: DateTime<Utc>,
  ) -> Result<i64, ProviderError> {
    sqlx::query(
      "INSERT INTO metadata_log (session_id, topic, published_at) VALUES (?, ?, ?)
       ON CONFLICT(session_id) DO NOTHING",
    )
    .bind(session_id.as_str())
    .bind(topic)
    .bind(timestamp.to_rfc3339_opts(SecondsFormat::Micros, true))
    .execute(&self.pool)
    .await
    .map_err(db_error)?;
    sqlx::query_scalar::<_, i64>("SELECT id FROM metadata_log WHERE session_id = ?")
      .bind(session_id.as_str())
      .fetch_one(&self.pool)
      .await
      .map_err(db_error)
  }

  async fn list_recent(&self, limit: usize) -> Result<Vec<MetadataRecord>, ProviderError> {
    let rows = sqlx::query(
      "SELECT id, session_id, topic, published_at FROM metadata_log ORDER BY published_at DESC, id DESC LIMIT ?",
    )
    .bind(i64::try_from(limit).unwrap_or(i64::MAX))
    .fetch_all(&self.pool)
    .await
    .map_err(db_error)?;

    rows
      .iter()
      .map(|row| {
        let published: String = row.try_get("published_at").map_err(db_error)?;
        let published_at = DateTime::parse_from_rfc3339(&published)
          .map_err(|e| ProviderError::permanent(LOG, format!("bad timestamp {published:?}: {e}")))?
          .with_timezone(&Utc);
        Ok(MetadataRecord {
          id: row.try_get("id").map_err(db_error)?,
          session_id: row.try_get("session_id").map_err(db_error)?,
          topic: row.try_get("topic").map_err(db_error)?,
          published_at,
        })
      })
      .collect()
  }
}
