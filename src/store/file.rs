//! Checkpoint save/load under a state directory (one JSON file per session).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::instrument;

use super::CheckpointStore;
use crate::error::StoreError;
use crate::types::{Checkpoint, SessionId};

/// Checkpoint filename inside a session directory.
pub const CHECKPOINT_FILENAME: &str = "checkpoint.json";

/// Stores `<root>/<session>/checkpoint.json`, written via a temp file and rename.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
  root: PathBuf,
}

impl FileCheckpointStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Path of the checkpoint file for `session_id`.
  pub fn checkpoint_path(&self, session_id: &SessionId) -> PathBuf {
    self
      .root
      .join(dir_name(session_id.as_str()))
      .join(CHECKPOINT_FILENAME)
  }
}

/// Escapes anything but ASCII alphanumerics and `-` as `_xx` so distinct ids never share a directory.
pub(super) fn dir_name(id: &str) -> String {
  let mut out = String::with_capacity(id.len());
  for b in id.bytes() {
    if b.is_ascii_alphanumeric() || b == b'-' {
      out.push(b as char);
    } else {
      out.push_str(&format!("_{b:02x}"));
    }
  }
  if out.is_empty() {
    out.push('_');
  }
  out
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
  #[instrument(level = "trace", skip(self, checkpoint))]
  async fn save(&self, session_id: &SessionId, checkpoint: &Checkpoint) -> Result<(), StoreError> {
    let path = self.checkpoint_path(session_id);
    let json = serde_json::to_vec_pretty(checkpoint)?;
    if let Some(parent) = path.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, &path).await?;
    Ok(())
  }

  #[instrument(level = "trace", skip(self))]
  async fn load(&self, session_id: &SessionId) -> Result<Option<Checkpoint>, StoreError> {
    match tokio::fs::read(self.checkpoint_path(session_id)).await {
      Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }
}
