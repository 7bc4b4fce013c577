//! Duplicate Check: pauses when the topic is too close to an already published one.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{info, instrument};

use super::{PipelineNode, Resumed, unexpected_resume};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::providers::{Metadata, Namespace, SimilarityIndex};
use crate::types::{
  DuplicateMatch, InterruptRequest, NodeName, NodeOutcome, ResumeSchema, ResumeValue,
  StateUpdate, WorkflowState,
};

const UNKNOWN: &str = "Unknown";

pub struct DuplicateCheckNode {
  index: Arc<dyn SimilarityIndex>,
  config: Arc<PipelineConfig>,
}

impl DuplicateCheckNode {
  pub fn new(index: Arc<dyn SimilarityIndex>, config: Arc<PipelineConfig>) -> Self {
    Self { index, config }
  }
}

fn round3(x: f64) -> f64 {
  (x * 1000.0).round() / 1000.0
}

/// Rebuilds the match from a persisted interrupt payload.
fn match_from_payload(payload: &Value) -> DuplicateMatch {
  let text = |key: &str| {
    payload
      .get(key)
      .and_then(Value::as_str)
      .unwrap_or(UNKNOWN)
      .to_string()
  };
  DuplicateMatch {
    existing_title: text("existing_title"),
    existing_date: text("existing_date"),
    similarity: payload
      .get("similarity_score")
      .and_then(Value::as_f64)
      .unwrap_or_default(),
  }
}

fn no_duplicate() -> NodeOutcome {
  NodeOutcome::update(StateUpdate {
    duplicate_match: Some(None),
    duplicate_override: Some(None),
    ..Default::default()
  })
}

#[async_trait]
impl PipelineNode for DuplicateCheckNode {
  fn name(&self) -> NodeName {
    NodeName::DuplicateCheck
  }

  #[instrument(level = "trace", skip(self, state, resume), fields(session_id = %state.session_id))]
  async fn run(
    &self,
    state: &WorkflowState,
    resume: Option<Resumed<'_>>,
  ) -> Result<NodeOutcome, PipelineError> {
    if let Some(Resumed { request, value }) = resume {
      let ResumeValue::Confirm(proceed) = value else {
        return Err(unexpected_resume(self.name(), value));
      };
      info!(proceed, "duplicate topic decision");
      return Ok(NodeOutcome::update(StateUpdate {
        duplicate_match: Some(Some(match_from_payload(&request.payload))),
        duplicate_override: Some(Some(*proceed)),
        ..Default::default()
      }));
    }

    let hits = self
      .index
      .query(Namespace::PublishedTopics, &state.topic, &Metadata::new(), 1)
      .await
      .map_err(|e| PipelineError::provider(self.name(), e))?;
    let Some(best) = hits.into_iter().next() else {
      return Ok(no_duplicate());
    };
    if best.similarity < self.config.duplicate_threshold {
      return Ok(no_duplicate());
    }

    let title = best.metadata.get("title").map_or(UNKNOWN, String::as_str);
    let date = best
      .metadata
      .get("published_date")
      .map_or(UNKNOWN, String::as_str);
    info!(similarity = best.similarity, existing_title = title, "similar topic already published");
    Ok(NodeOutcome::Interrupt(InterruptRequest::new(
      self.name(),
      ResumeSchema::Confirm,
      json!({
        "warning": "similar_topic_published",
        "existing_title": title,
        "existing_date": date,
        "similarity_score": round3(best.similarity),
        "instructions": "Answer true to write the article anyway, false to stop.",
      }),
    )))
  }
}
