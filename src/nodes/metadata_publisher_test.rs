//! Tests for the metadata publisher.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::test_support::{TOPIC, state};
use super::{MetadataPublisherNode, PipelineNode};
use crate::error::{PipelineError, ProviderError};
use crate::providers::{
  IndexHit, InMemoryMetadataLog, InMemorySimilarityIndex, Metadata, MetadataLog, Namespace,
  SimilarityIndex,
};
use crate::types::{NodeName, NodeOutcome, StateUpdate};

/// Index whose first upsert fails; later calls go to the inner index.
#[derive(Default)]
struct FailsFirstUpsert {
  inner: InMemorySimilarityIndex,
  failed: AtomicBool,
}

#[async_trait]
impl SimilarityIndex for FailsFirstUpsert {
  async fn upsert(
    &self,
    namespace: Namespace,
    id: &str,
    text: &str,
    metadata: Metadata,
  ) -> Result<(), ProviderError> {
    if !self.failed.swap(true, Ordering::SeqCst) {
      return Err(ProviderError::permanent("similarity_index", "unavailable"));
    }
    self.inner.upsert(namespace, id, text, metadata).await
  }

  async fn query(
    &self,
    namespace: Namespace,
    text: &str,
    filter: &Metadata,
    k: usize,
  ) -> Result<Vec<IndexHit>, ProviderError> {
    self.inner.query(namespace, text, filter, k).await
  }

  async fn count(&self, namespace: Namespace, filter: &Metadata) -> Result<usize, ProviderError> {
    self.inner.count(namespace, filter).await
  }
}

#[tokio::test]
async fn records_log_entry_and_indexes_topic() {
  let log = Arc::new(InMemoryMetadataLog::new());
  let index = Arc::new(InMemorySimilarityIndex::new());
  let node = MetadataPublisherNode::new(log.clone(), index.clone());

  let out = node.run(&state("m1"), None).await.unwrap();
  assert_eq!(
    out,
    NodeOutcome::Update(StateUpdate {
      metadata_saved: true,
      ..Default::default()
    })
  );

  let records = log.list_recent(10).await.unwrap();
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].session_id, "m1");
  assert_eq!(records[0].topic, TOPIC);

  let hits = index
    .query(Namespace::PublishedTopics, TOPIC, &Metadata::new(), 1)
    .await
    .unwrap();
  assert_eq!(hits[0].id, "m1");
  assert_eq!(hits[0].metadata["title"], TOPIC);
  assert_eq!(hits[0].metadata["session_id"], "m1");
  assert!(hits[0].metadata.contains_key("published_date"));
}

#[tokio::test]
async fn already_saved_is_a_no_op() {
  let log = Arc::new(InMemoryMetadataLog::new());
  let index = Arc::new(InMemorySimilarityIndex::new());
  let node = MetadataPublisherNode::new(log.clone(), index.clone());
  let mut s = state("m2");
  s.metadata_saved = true;

  let out = node.run(&s, None).await.unwrap();
  assert_eq!(out, NodeOutcome::Update(StateUpdate::default()));
  assert!(log.is_empty().await);
  assert_eq!(
    index.count(Namespace::PublishedTopics, &Metadata::new()).await.unwrap(),
    0
  );
}

#[tokio::test]
async fn retry_after_failed_upsert_records_the_session_once() {
  let log = Arc::new(InMemoryMetadataLog::new());
  let index = Arc::new(FailsFirstUpsert::default());
  let node = MetadataPublisherNode::new(log.clone(), index.clone());
  let s = state("m3");

  let err = node.run(&s, None).await.unwrap_err();
  assert!(matches!(err, PipelineError::Provider { node: NodeName::MetadataPublisher, .. }));
  assert!(log.is_empty().await);

  node.run(&s, None).await.unwrap();
  assert_eq!(log.len().await, 1);
  assert_eq!(
    index.count(Namespace::PublishedTopics, &Metadata::new()).await.unwrap(),
    1
  );
}

#[tokio::test]
async fn rerun_after_committed_writes_does_not_duplicate() {
  let log = Arc::new(InMemoryMetadataLog::new());
  let index = Arc::new(InMemorySimilarityIndex::new());
  let node = MetadataPublisherNode::new(log.clone(), index.clone());
  let s = state("m4");

  node.run(&s, None).await.unwrap();
  node.run(&s, None).await.unwrap();
  assert_eq!(log.len().await, 1);
  assert_eq!(
    index.count(Namespace::PublishedTopics, &Metadata::new()).await.unwrap(),
    1
  );
}
