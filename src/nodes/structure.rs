//! Structure: H1/H2/H3 outline from the research report, regenerated on reviewer feedback.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, instrument};

use super::{PipelineNode, Resumed};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::prompts::{context_block, structure_prompt};
use crate::providers::{GenerationProvider, GenerationRequest};
use crate::types::{NodeName, NodeOutcome, StateUpdate, WorkflowState};

const SYSTEM_PROMPT: &str = "You are an SEO editor. Answer with a Markdown heading outline only.";

pub struct StructureNode {
  generation: Arc<dyn GenerationProvider>,
  config: Arc<PipelineConfig>,
}

impl StructureNode {
  pub fn new(generation: Arc<dyn GenerationProvider>, config: Arc<PipelineConfig>) -> Self {
    Self { generation, config }
  }
}

#[async_trait]
impl PipelineNode for StructureNode {
  fn name(&self) -> NodeName {
    NodeName::Structure
  }

  #[instrument(level = "trace", skip(self, state, _resume), fields(session_id = %state.session_id))]
  async fn run(
    &self,
    state: &WorkflowState,
    _resume: Option<Resumed<'_>>,
  ) -> Result<NodeOutcome, PipelineError> {
    let context = context_block(
      self.config.brand_context.as_deref(),
      state.brief.as_deref(),
      Utc::now().date_naive(),
    );
    let outline = self
      .generation
      .generate(GenerationRequest {
        system_prompt: SYSTEM_PROMPT.to_string(),
        user_prompt: structure_prompt(state, &context, &self.config.language),
        max_tokens: self.config.structure_max_tokens,
        temperature: self.config.research_temperature,
        model: Some(self.config.research_model.clone()),
      })
      .await
      .map_err(|e| PipelineError::provider(self.name(), e))?;
    info!(iteration = state.cp1_iterations, "outline generated");
    Ok(NodeOutcome::update(StateUpdate {
      heading_structure: Some(outline.trim().to_string()),
      ..Default::default()
    }))
  }
}
