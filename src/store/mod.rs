//! Durable checkpoint stores.
//!
//! A store keeps exactly one checkpoint per session: the latest. Saves replace the
//! previous checkpoint atomically, so a crash mid-save leaves the prior one readable.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{Checkpoint, SessionId};

mod file;
#[cfg(test)]
mod file_test;
mod memory;
mod sqlite;
#[cfg(test)]
mod sqlite_test;

pub use file::{CHECKPOINT_FILENAME, FileCheckpointStore};
pub use memory::InMemoryCheckpointStore;
pub use sqlite::SqliteCheckpointStore;

#[async_trait]
pub trait CheckpointStore: Send + Sync {
  /// Replaces the session's checkpoint.
  async fn save(&self, session_id: &SessionId, checkpoint: &Checkpoint) -> Result<(), StoreError>;

  /// The latest checkpoint, or `None` for an unknown session.
  async fn load(&self, session_id: &SessionId) -> Result<Option<Checkpoint>, StoreError>;
}
