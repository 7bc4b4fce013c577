//! In-process checkpoint store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CheckpointStore;
use crate::error::StoreError;
use crate::types::{Checkpoint, SessionId};

/// Keeps serialized checkpoints in memory. Stored bytes are exposed through
/// [InMemoryCheckpointStore::raw] so callers can compare snapshots exactly.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
  entries: RwLock<HashMap<SessionId, Vec<u8>>>,
}

impl InMemoryCheckpointStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Serialized bytes of the latest checkpoint.
  pub async fn raw(&self, session_id: &SessionId) -> Option<Vec<u8>> {
    self.entries.read().await.get(session_id).cloned()
  }

  pub async fn len(&self) -> usize {
    self.entries.read().await.len()
  }

  pub async fn is_empty(&self) -> bool {
    self.len().await == 0
  }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
  async fn save(&self, session_id: &SessionId, checkpoint: &Checkpoint) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(checkpoint)?;
    self.entries.write().await.insert(session_id.clone(), bytes);
    Ok(())
  }

  async fn load(&self, session_id: &SessionId) -> Result<Option<Checkpoint>, StoreError> {
    match self.entries.read().await.get(session_id) {
      Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
      None => Ok(None),
    }
  }
}
