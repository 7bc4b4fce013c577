//! Human review gates: outline review (Gate 1) and draft review (Gate 2).
//!
//! A gate always interrupts on first entry and acts on the reviewer's decision when
//! resumed: approve, reject with feedback (loops back), or abort.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, instrument};

use super::{PipelineNode, Resumed, unexpected_resume};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::types::{
  InterruptRequest, NodeName, NodeOutcome, Rejection, ResumeSchema, ResumeValue, StateUpdate,
  WorkflowState,
};

/// Gate 1: review of the research report and heading outline.
#[derive(Debug, Default)]
pub struct OutlineReviewGate;

impl OutlineReviewGate {
  pub fn new() -> Self {
    Self
  }
}

/// Reviewer's edited outline (or the current one) with the optional note appended.
fn outline_feedback(state: &WorkflowState, edited: Option<&str>, note: Option<&str>) -> String {
  let outline = edited
    .map(str::to_string)
    .or_else(|| state.heading_structure.clone())
    .unwrap_or_default();
  match note.map(str::trim).filter(|n| !n.is_empty()) {
    Some(note) => format!("{outline}\n\nNote: {note}"),
    None => outline,
  }
}

#[async_trait]
impl PipelineNode for OutlineReviewGate {
  fn name(&self) -> NodeName {
    NodeName::CheckpointGate1
  }

  #[instrument(level = "trace", skip(self, state, resume), fields(session_id = %state.session_id))]
  async fn run(
    &self,
    state: &WorkflowState,
    resume: Option<Resumed<'_>>,
  ) -> Result<NodeOutcome, PipelineError> {
    let Some(Resumed { value, .. }) = resume else {
      return Ok(NodeOutcome::Interrupt(InterruptRequest::new(
        self.name(),
        ResumeSchema::OutlineReview,
        json!({
          "checkpoint": "checkpoint_1",
          "research_report": state.research_report.as_deref().unwrap_or_default(),
          "heading_structure": state.heading_structure.as_deref().unwrap_or_default(),
          "cp1_iterations": state.cp1_iterations,
          "instructions": "Approve or reject the research report and outline. When rejecting, \
                           send the edited outline and an optional note.",
        }),
      )));
    };

    match value {
      ResumeValue::Approve => {
        info!("outline approved");
        Ok(NodeOutcome::update(StateUpdate {
          cp1_approved: Some(true),
          ..Default::default()
        }))
      }
      ResumeValue::Reject(Rejection::Outline {
        edited_outline,
        note,
      }) => {
        info!(iteration = state.cp1_iterations + 1, "outline rejected");
        Ok(NodeOutcome::update(StateUpdate {
          cp1_approved: Some(false),
          cp1_feedback: Some(outline_feedback(
            state,
            edited_outline.as_deref(),
            note.as_deref(),
          )),
          cp1_rejected: true,
          ..Default::default()
        }))
      }
      ResumeValue::Abort => {
        info!("run aborted at outline review");
        Ok(NodeOutcome::abort())
      }
      other => Err(unexpected_resume(self.name(), other)),
    }
  }
}

/// Gate 2: review of the validated draft. Warns, without blocking, once the number of
/// rejections reaches the configured soft cap.
pub struct DraftReviewGate {
  config: Arc<PipelineConfig>,
}

impl DraftReviewGate {
  pub fn new(config: Arc<PipelineConfig>) -> Self {
    Self { config }
  }
}

#[async_trait]
impl PipelineNode for DraftReviewGate {
  fn name(&self) -> NodeName {
    NodeName::CheckpointGate2
  }

  #[instrument(level = "trace", skip(self, state, resume), fields(session_id = %state.session_id))]
  async fn run(
    &self,
    state: &WorkflowState,
    resume: Option<Resumed<'_>>,
  ) -> Result<NodeOutcome, PipelineError> {
    let Some(Resumed { value, .. }) = resume else {
      let mut payload = json!({
        "checkpoint": "checkpoint_2",
        "draft": state.draft.as_deref().unwrap_or_default(),
        "draft_validated": state.draft_validated,
        "cp2_iterations": state.cp2_iterations,
        "instructions": "Approve or reject the draft. When rejecting, point at the sections \
                         to fix; the rest is kept verbatim.",
      });
      if state.cp2_iterations >= self.config.cp2_soft_cap {
        payload["warning"] = json!(format!(
          "{} revision rounds reached; you can still reject, or approve the current version.",
          self.config.cp2_soft_cap
        ));
      }
      if state.draft_validated == Some(false) {
        payload["validation_warning"] = json!(
          "The draft does not meet every content requirement after automatic retries. \
           Approve and edit by hand, or reject with feedback."
        );
      }
      return Ok(NodeOutcome::Interrupt(InterruptRequest::new(
        self.name(),
        ResumeSchema::DraftReview,
        payload,
      )));
    };

    match value {
      ResumeValue::Approve => {
        info!("draft approved");
        Ok(NodeOutcome::update(StateUpdate {
          cp2_approved: Some(true),
          ..Default::default()
        }))
      }
      ResumeValue::Reject(Rejection::Draft { feedback }) => {
        info!(iteration = state.cp2_iterations + 1, "draft rejected");
        Ok(NodeOutcome::update(StateUpdate {
          cp2_approved: Some(false),
          cp2_feedback: Some(feedback.clone()),
          cp2_rejected: true,
          ..Default::default()
        }))
      }
      ResumeValue::Abort => {
        info!("run aborted at draft review");
        Ok(NodeOutcome::abort())
      }
      other => Err(unexpected_resume(self.name(), other)),
    }
  }
}
