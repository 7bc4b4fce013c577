//! Tests for `SqliteCheckpointStore`.

use super::{CheckpointStore, SqliteCheckpointStore};
use crate::types::{Checkpoint, Cursor, NodeName, SessionId, WorkflowState};

fn checkpoint(id: &str) -> Checkpoint {
  Checkpoint::initial(
    WorkflowState::new(SessionId::new(id), "topic", vec!["kw".to_string()]),
    NodeName::DuplicateCheck,
  )
}

#[tokio::test]
async fn upsert_keeps_latest_and_survives_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("state").join("checkpoints.db");
  let id = SessionId::new("s1");
  let mut cp = checkpoint("s1");
  {
    let store = SqliteCheckpointStore::open(&path).await.unwrap();
    assert!(store.load(&id).await.unwrap().is_none());
    store.save(&id, &cp).await.unwrap();
    cp.cursor = Cursor::Terminal;
    cp.step = 9;
    store.save(&id, &cp).await.unwrap();
  }
  let store = SqliteCheckpointStore::open(&path).await.unwrap();
  assert_eq!(store.load(&id).await.unwrap(), Some(cp));
}

#[tokio::test]
async fn sessions_are_independent() {
  let dir = tempfile::tempdir().unwrap();
  let store = SqliteCheckpointStore::open(dir.path().join("cp.db")).await.unwrap();
  store.save(&SessionId::new("a"), &checkpoint("a")).await.unwrap();
  store.save(&SessionId::new("b"), &checkpoint("b")).await.unwrap();
  let a = store.load(&SessionId::new("a")).await.unwrap().unwrap();
  assert_eq!(a.session_id.as_str(), "a");
  let b = store.load(&SessionId::new("b")).await.unwrap().unwrap();
  assert_eq!(b.session_id.as_str(), "b");
}
