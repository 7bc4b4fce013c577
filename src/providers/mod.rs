//! Interfaces to the external collaborators the nodes consume.
//!
//! Bundled implementations: an in-process similarity index and metadata log, a SQLite
//! metadata log, and command-backed research and generation providers.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::types::SessionId;

mod command;
mod memory;
mod sqlite_log;

pub use command::{CommandGenerationProvider, CommandResearchProvider, RATE_LIMITED_EXIT_CODE};
pub use memory::{InMemoryMetadataLog, InMemorySimilarityIndex};
pub use sqlite_log::SqliteMetadataLog;

/// String key/value metadata attached to index entries; also used as an equality filter.
pub type Metadata = BTreeMap<String, String>;

/// One web research hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
  pub title: String,
  pub url: String,
  pub summary: String,
  #[serde(default)]
  pub text: String,
}

#[async_trait]
pub trait ResearchProvider: Send + Sync {
  /// Ordered search results; rate limiting is reported as [crate::error::ProviderErrorKind::RateLimited].
  async fn search(&self, topic: &str, keywords: &[String]) -> Result<Vec<SearchResult>, ProviderError>;
}

/// Parameters for one text generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
  pub system_prompt: String,
  pub user_prompt: String,
  pub max_tokens: u32,
  pub temperature: f32,
  /// Backend model hint; providers may ignore it.
  pub model: Option<String>,
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
  async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError>;
}

/// Logical partitions of the similarity index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
  /// Style exemplar fragments.
  Corpus,
  /// Topics of already published articles.
  PublishedTopics,
}

/// A ranked similarity query hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
  pub id: String,
  pub text: String,
  pub metadata: Metadata,
  /// Higher is more similar; `1.0` is identical.
  pub similarity: f64,
}

#[async_trait]
pub trait SimilarityIndex: Send + Sync {
  async fn upsert(
    &self,
    namespace: Namespace,
    id: &str,
    text: &str,
    metadata: Metadata,
  ) -> Result<(), ProviderError>;

  /// Up to `k` entries matching every `filter` pair, most similar first.
  async fn query(
    &self,
    namespace: Namespace,
    text: &str,
    filter: &Metadata,
    k: usize,
  ) -> Result<Vec<IndexHit>, ProviderError>;

  async fn count(&self, namespace: Namespace, filter: &Metadata) -> Result<usize, ProviderError>;
}

/// A published-article record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
  pub id: i64,
  pub session_id: String,
  pub topic: String,
  pub published_at: DateTime<Utc>,
}

#[async_trait]
pub trait MetadataLog: Send + Sync {
  /// Appends a record and returns its id. At most one record exists per session: a repeated
  /// append for the same session returns the existing record's id and writes nothing.
  async fn append(
    &self,
    session_id: &SessionId,
    topic: &str,
    timestamp: DateTime<Utc>,
  ) -> Result<i64, ProviderError>;

  /// Most recent records first.
  async fn list_recent(&self, limit: usize) -> Result<Vec<MetadataRecord>, ProviderError>;
}
