//! Tests for `FileCheckpointStore`.

use super::file::dir_name;
use super::{CHECKPOINT_FILENAME, CheckpointStore, FileCheckpointStore};
use crate::types::{Checkpoint, Cursor, NodeName, SessionId, WorkflowState};

fn checkpoint(id: &str) -> Checkpoint {
  Checkpoint::initial(
    WorkflowState::new(SessionId::new(id), "Jak zwiększyć ruch na blogu firmowym", vec!["SEO blog".to_string()]),
    NodeName::DuplicateCheck,
  )
}

#[tokio::test]
async fn roundtrip_save_load() {
  let dir = tempfile::tempdir().unwrap();
  let store = FileCheckpointStore::new(dir.path());
  let id = SessionId::new("run-1");
  let mut cp = checkpoint("run-1");
  cp.cursor = Cursor::Node(NodeName::Structure);
  cp.completed_nodes = vec![NodeName::DuplicateCheck, NodeName::Researcher];
  cp.step = 2;
  store.save(&id, &cp).await.unwrap();

  let path = store.checkpoint_path(&id);
  assert!(path.exists());
  assert_eq!(path.file_name().unwrap(), CHECKPOINT_FILENAME);
  assert!(!path.with_extension("json.tmp").exists());
  assert_eq!(store.load(&id).await.unwrap(), Some(cp));
}

#[tokio::test]
async fn load_missing_session_is_none() {
  let dir = tempfile::tempdir().unwrap();
  let store = FileCheckpointStore::new(dir.path());
  assert!(store.load(&SessionId::new("absent")).await.unwrap().is_none());
}

#[tokio::test]
async fn corrupt_file_is_an_error() {
  let dir = tempfile::tempdir().unwrap();
  let store = FileCheckpointStore::new(dir.path());
  let id = SessionId::new("bad");
  let path = store.checkpoint_path(&id);
  std::fs::create_dir_all(path.parent().unwrap()).unwrap();
  std::fs::write(&path, b"{not json").unwrap();
  assert!(store.load(&id).await.is_err());
}

#[test]
fn session_ids_escape_path_separators() {
  assert_eq!(dir_name("abc-123"), "abc-123");
  assert_eq!(dir_name("../etc"), "_2e_2e_2fetc");
  assert_ne!(dir_name("a/b"), dir_name("a_b"));
  assert_eq!(dir_name(""), "_");
}
