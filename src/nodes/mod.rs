//! The seven pipeline stages.
//!
//! Each stage implements [PipelineNode]: it reads the current [WorkflowState] and returns a
//! [NodeOutcome]. Nodes never write state or checkpoints themselves; the engine merges
//! their updates and persists the result.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::providers::{GenerationProvider, MetadataLog, ResearchProvider, SimilarityIndex};
use crate::types::{InterruptRequest, NodeName, NodeOutcome, ResumeValue, WorkflowState};

mod checkpoint_gate;
pub mod draft_validation;
mod duplicate_check;
mod metadata_publisher;
#[cfg(test)]
mod metadata_publisher_test;
mod researcher;
mod structure;
#[cfg(test)]
pub(crate) mod test_support;
mod writer;

pub use checkpoint_gate::{DraftReviewGate, OutlineReviewGate};
pub use draft_validation::{DraftCheck, DraftReport, DraftRules, strip_thinking, validate_draft};
pub use duplicate_check::DuplicateCheckNode;
pub use metadata_publisher::MetadataPublisherNode;
pub use researcher::ResearcherNode;
pub use structure::StructureNode;
pub use writer::WriterNode;

/// A pending interrupt together with the validated reply it is being resumed with.
#[derive(Debug, Clone, Copy)]
pub struct Resumed<'a> {
  pub request: &'a InterruptRequest,
  pub value: &'a ResumeValue,
}

#[async_trait]
pub trait PipelineNode: Send + Sync {
  fn name(&self) -> NodeName;

  /// Runs the stage once. `resume` is set only when re-entering after this node's own
  /// interrupt.
  async fn run(
    &self,
    state: &WorkflowState,
    resume: Option<Resumed<'_>>,
  ) -> Result<NodeOutcome, PipelineError>;
}

/// External collaborators shared by the nodes.
#[derive(Clone)]
pub struct Providers {
  pub research: Arc<dyn ResearchProvider>,
  pub generation: Arc<dyn GenerationProvider>,
  pub index: Arc<dyn SimilarityIndex>,
  pub metadata_log: Arc<dyn MetadataLog>,
}

/// Error for a resume value the node's schema cannot produce; the engine validates
/// schemas first, so reaching this means the node and its schema disagree.
pub(crate) fn unexpected_resume(node: NodeName, value: &ResumeValue) -> PipelineError {
  PipelineError::InvariantViolation(format!("{node} cannot handle resume value {value:?}"))
}
