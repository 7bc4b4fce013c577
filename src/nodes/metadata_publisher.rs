//! Metadata Publisher: records the published article and indexes its topic for later
//! duplicate checks.
//!
//! Both writes are keyed by session id, so a retry after a partial failure cannot record
//! the session twice. The index upsert runs first; the log append last.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, instrument};

use super::{PipelineNode, Resumed};
use crate::error::PipelineError;
use crate::providers::{Metadata, MetadataLog, Namespace, SimilarityIndex};
use crate::types::{NodeName, NodeOutcome, StateUpdate, WorkflowState};

pub struct MetadataPublisherNode {
  metadata_log: Arc<dyn MetadataLog>,
  index: Arc<dyn SimilarityIndex>,
}

impl MetadataPublisherNode {
  pub fn new(metadata_log: Arc<dyn MetadataLog>, index: Arc<dyn SimilarityIndex>) -> Self {
    Self {
      metadata_log,
      index,
    }
  }
}

#[async_trait]
impl PipelineNode for MetadataPublisherNode {
  fn name(&self) -> NodeName {
    NodeName::MetadataPublisher
  }

  #[instrument(level = "trace", skip(self, state, _resume), fields(session_id = %state.session_id))]
  async fn run(
    &self,
    state: &WorkflowState,
    _resume: Option<Resumed<'_>>,
  ) -> Result<NodeOutcome, PipelineError> {
    if state.metadata_saved {
      return Ok(NodeOutcome::update(StateUpdate::default()));
    }

    let now = Utc::now();
    let metadata: Metadata = [
      ("title".to_string(), state.topic.clone()),
      ("published_date".to_string(), now.to_rfc3339()),
      ("session_id".to_string(), state.session_id.to_string()),
    ]
    .into_iter()
    .collect();

    self
      .index
      .upsert(
        Namespace::PublishedTopics,
        state.session_id.as_str(),
        &state.topic,
        metadata,
      )
      .await
      .map_err(|e| PipelineError::provider(self.name(), e))?;
    let record_id = self
      .metadata_log
      .append(&state.session_id, &state.topic, now)
      .await
      .map_err(|e| PipelineError::provider(self.name(), e))?;

    info!(record_id, topic = %state.topic, "metadata saved");
    Ok(NodeOutcome::update(StateUpdate {
      metadata_saved: true,
      ..Default::default()
    }))
  }
}
