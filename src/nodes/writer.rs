//! Writer: drafts the article in the house style and retries locally until the draft
//! passes validation or the attempts run out.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument, warn};

use super::draft_validation::{DraftRules, strip_thinking, validate_draft};
use super::{PipelineNode, Resumed, unexpected_resume};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, ProviderError};
use crate::prompts::{WriterPrompt, context_block, writer_system_prompt};
use crate::providers::{GenerationProvider, GenerationRequest, Metadata, Namespace, SimilarityIndex};
use crate::types::{
  InterruptRequest, NodeName, NodeOutcome, ResumeSchema, ResumeValue, StateUpdate, WorkflowState,
};

pub struct WriterNode {
  generation: Arc<dyn GenerationProvider>,
  index: Arc<dyn SimilarityIndex>,
  config: Arc<PipelineConfig>,
  rules: DraftRules,
}

impl WriterNode {
  pub fn new(
    generation: Arc<dyn GenerationProvider>,
    index: Arc<dyn SimilarityIndex>,
    config: Arc<PipelineConfig>,
  ) -> Self {
    let rules = DraftRules::from_config(&config);
    Self {
      generation,
      index,
      config,
      rules,
    }
  }

  fn provider_error(&self, e: ProviderError) -> PipelineError {
    PipelineError::provider(self.name(), e)
  }

  /// Style exemplars for `topic`, own texts first; falls back to every source type when
  /// too few own fragments match.
  async fn exemplars(&self, topic: &str) -> Result<Vec<String>, PipelineError> {
    let own: Metadata = [("source_type".to_string(), self.config.own_source_type.clone())]
      .into_iter()
      .collect();
    let hits = self
      .index
      .query(Namespace::Corpus, topic, &own, self.config.exemplar_count)
      .await
      .map_err(|e| self.provider_error(e))?;
    let hits = if hits.len() >= self.config.exemplar_min_own {
      hits
    } else {
      self
        .index
        .query(Namespace::Corpus, topic, &Metadata::new(), self.config.exemplar_count)
        .await
        .map_err(|e| self.provider_error(e))?
    };
    Ok(hits.into_iter().map(|h| h.text).collect())
  }
}

#[async_trait]
impl PipelineNode for WriterNode {
  fn name(&self) -> NodeName {
    NodeName::Writer
  }

  #[instrument(level = "trace", skip(self, state, resume), fields(session_id = %state.session_id))]
  async fn run(
    &self,
    state: &WorkflowState,
    resume: Option<Resumed<'_>>,
  ) -> Result<NodeOutcome, PipelineError> {
    match resume {
      Some(Resumed {
        value: ResumeValue::Confirm(false),
        ..
      }) => {
        info!("writing declined on low style corpus");
        return Ok(NodeOutcome::update(StateUpdate {
          draft: Some(None),
          draft_validated: Some(false),
          ..Default::default()
        }));
      }
      Some(Resumed {
        value: ResumeValue::Confirm(true),
        ..
      }) => {}
      Some(Resumed { value, .. }) => return Err(unexpected_resume(self.name(), value)),
      None => {
        let corpus = self
          .index
          .count(Namespace::Corpus, &Metadata::new())
          .await
          .map_err(|e| self.provider_error(e))?;
        if corpus < self.config.low_corpus_threshold {
          warn!(corpus, threshold = self.config.low_corpus_threshold, "style corpus below threshold");
          return Ok(NodeOutcome::Interrupt(InterruptRequest::new(
            self.name(),
            ResumeSchema::Confirm,
            json!({
              "warning": "low_corpus",
              "message": format!(
                "The style corpus holds only {corpus} fragments (threshold {}). \
                 The draft's style may suffer.",
                self.config.low_corpus_threshold
              ),
              "corpus_count": corpus,
              "threshold": self.config.low_corpus_threshold,
              "instructions": "Answer true to write anyway, false to skip drafting.",
            }),
          )));
        }
      }
    }

    let exemplars = self.exemplars(&state.topic).await?;
    let context = context_block(
      self.config.brand_context.as_deref(),
      state.brief.as_deref(),
      Utc::now().date_naive(),
    );
    let system_prompt = writer_system_prompt(&self.config.language, &self.config.forbidden_stems);
    let revision = state
      .cp2_feedback
      .as_deref()
      .zip(state.draft.as_deref());

    let mut last = String::new();
    for attempt in 1..=self.config.writer_max_attempts {
      let user_prompt = WriterPrompt {
        state,
        context: &context,
        exemplars: &exemplars,
        min_words: self.config.min_word_count,
        meta_min: self.config.meta_description_min_chars,
        meta_max: self.config.meta_description_max_chars,
        revision: if attempt == 1 { revision } else { None },
      }
      .render();
      let raw = self
        .generation
        .generate(GenerationRequest {
          system_prompt: system_prompt.clone(),
          user_prompt,
          max_tokens: self.config.draft_max_tokens,
          temperature: self.config.draft_temperature,
          model: Some(self.config.draft_model.clone()),
        })
        .await
        .map_err(|e| self.provider_error(e))?;
      let draft = strip_thinking(&raw);
      let report = validate_draft(&draft, state.primary_keyword(), &self.rules);
      if report.passed() {
        info!(attempt, words = report.word_count, "draft passed validation");
        return Ok(NodeOutcome::update(StateUpdate {
          draft: Some(Some(draft)),
          draft_validated: Some(true),
          ..Default::default()
        }));
      }
      let failed: Vec<String> = report.failures().iter().map(ToString::to_string).collect();
      warn!(attempt, max = self.config.writer_max_attempts, ?failed, "draft failed validation");
      last = draft;
    }

    Ok(NodeOutcome::update(StateUpdate {
      draft: Some(Some(last)),
      draft_validated: Some(false),
      ..Default::default()
    }))
  }
}
