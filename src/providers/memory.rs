//! In-process similarity index and metadata log.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

use super::{IndexHit, Metadata, MetadataLog, MetadataRecord, Namespace, SimilarityIndex};
use crate::error::ProviderError;
use crate::types::SessionId;

const INDEX: &str = "similarity_index";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
  namespace: Namespace,
  id: String,
  text: String,
  metadata: Metadata,
}

/// Bag-of-words cosine similarity index.
///
/// When opened with a snapshot path, every upsert rewrites the snapshot so the index
/// survives process restarts.
#[derive(Debug, Default)]
pub struct InMemorySimilarityIndex {
  entries: RwLock<BTreeMap<(Namespace, String), IndexEntry>>,
  snapshot: Option<PathBuf>,
}

impl InMemorySimilarityIndex {
  pub fn new() -> Self {
    Self::default()
  }

  /// Loads `path` if it exists and persists every later upsert to it.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
    let path = path.as_ref().to_path_buf();
    let entries = match tokio::fs::read(&path).await {
      Ok(bytes) => {
        let list: Vec<IndexEntry> = serde_json::from_slice(&bytes)
          .map_err(|e| ProviderError::permanent(INDEX, format!("snapshot {}: {}", path.display(), e)))?;
        list
          .into_iter()
          .map(|e| ((e.namespace, e.id.clone()), e))
          .collect()
      }
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
      Err(e) => return Err(ProviderError::permanent(INDEX, e.to_string())),
    };
    Ok(Self {
      entries: RwLock::new(entries),
      snapshot: Some(path),
    })
  }

  async fn persist(&self, entries: &BTreeMap<(Namespace, String), IndexEntry>) -> Result<(), ProviderError> {
    let Some(path) = &self.snapshot else {
      return Ok(());
    };
    let list: Vec<&IndexEntry> = entries.values().collect();
    let json = serde_json::to_vec_pretty(&list).map_err(|e| ProviderError::permanent(INDEX, e.to_string()))?;
    if let Some(parent) = path.parent() {
      tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| ProviderError::permanent(INDEX, e.to_string()))?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
      .await
      .map_err(|e| ProviderError::permanent(INDEX, e.to_string()))?;
    tokio::fs::rename(&tmp, path)
      .await
      .map_err(|e| ProviderError::permanent(INDEX, e.to_string()))
  }
}

/// Lowercased alphanumeric token counts.
pub(crate) fn term_counts(text: &str) -> HashMap<String, f64> {
  let mut counts = HashMap::new();
  for token in text
    .split(|c: char| !c.is_alphanumeric())
    .filter(|t| !t.is_empty())
  {
    *counts.entry(token.to_lowercase()).or_insert(0.0) += 1.0;
  }
  counts
}

/// Cosine similarity of two token-count vectors; `0.0` when either is empty.
pub(crate) fn cosine(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
  let dot: f64 = a
    .iter()
    .filter_map(|(t, x)| b.get(t).map(|y| x * y))
    .sum();
  let norm = |v: &HashMap<String, f64>| v.values().map(|x| x * x).sum::<f64>().sqrt();
  let denom = norm(a) * norm(b);
  if denom == 0.0 { 0.0 } else { dot / denom }
}

fn matches_filter(metadata: &Metadata, filter: &Metadata) -> bool {
  filter.iter().all(|(k, v)| metadata.get(k) == Some(v))
}

#[async_trait]
impl SimilarityIndex for InMemorySimilarityIndex {
  #[instrument(level = "trace", skip(self, text, metadata))]
  async fn upsert(
    &self,
    namespace: Namespace,
    id: &str,
    text: &str,
    metadata: Metadata,
  ) -> Result<(), ProviderError> {
    let mut entries = self.entries.write().await;
    entries.insert(
      (namespace, id.to_string()),
      IndexEntry {
        namespace,
        id: id.to_string(),
        text: text.to_string(),
        metadata,
      },
    );
    self.persist(&entries).await
  }

  #[instrument(level = "trace", skip(self, text, filter))]
  async fn query(
    &self,
    namespace: Namespace,
    text: &str,
    filter: &Metadata,
    k: usize,
  ) -> Result<Vec<IndexHit>, ProviderError> {
    let query = term_counts(text);
    let entries = self.entries.read().await;
    let mut hits: Vec<IndexHit> = entries
      .values()
      .filter(|e| e.namespace == namespace && matches_filter(&e.metadata, filter))
      .map(|e| IndexHit {
        id: e.id.clone(),
        text: e.text.clone(),
        metadata: e.metadata.clone(),
        similarity: cosine(&query, &term_counts(&e.text)),
      })
      .collect();
    hits.sort_by(|a, b| {
      b.similarity
        .total_cmp(&a.similarity)
        .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(k);
    Ok(hits)
  }

  async fn count(&self, namespace: Namespace, filter: &Metadata) -> Result<usize, ProviderError> {
    let entries = self.entries.read().await;
    Ok(
      entries
        .values()
        .filter(|e| e.namespace == namespace && matches_filter(&e.metadata, filter))
        .count(),
    )
  }
}

/// Metadata log kept in memory; ids start at 1.
#[derive(Debug, Default)]
pub struct InMemoryMetadataLog {
  records: Mutex<Vec<MetadataRecord>>,
}

impl InMemoryMetadataLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn len(&self) -> usize {
    self.records.lock().await.len()
  }

  pub async fn is_empty(&self) -> bool {
    self.len().await == 0
  }
}

#[async_trait]
impl MetadataLog for InMemoryMetadataLog {
  async fn append(
    &self,
    session_id: &SessionId,
    topic: &str,
    timestamp: DateTime<Utc>,
  ) -> Result<i64, ProviderError> {
    let mut records = self.records.lock().await;
    if let Some(existing) = records.iter().find(|r| r.session_id == session_id.as_str()) {
      return Ok(existing.id);
    }
    let id = records.len() as i64 + 1;
    records.push(MetadataRecord {
      id,
      session_id: session_id.to_string(),
      topic: topic.to_string(),
      published_at: timestamp,
    });
    Ok(id)
  }

  async fn list_recent(&self, limit: usize) -> Result<Vec<MetadataRecord>, ProviderError> {
    let records = self.records.lock().await;
    let mut out: Vec<MetadataRecord> = records.clone();
    out.sort_by(|a, b| b.published_at.cmp(&a.published_at).then(b.id.cmp(&a.id)));
    out.truncate(limit);
    Ok(out)
  }
}
