//! Researcher: web research with a per-session cache, rate-limit backoff and a
//! generated synthesis.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::{PipelineNode, Resumed};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::prompts::research_synthesis_prompt;
use crate::providers::{GenerationProvider, GenerationRequest, ResearchProvider, SearchResult};
use crate::types::{CachedSource, NodeName, NodeOutcome, StateUpdate, WorkflowState};

const SYSTEM_PROMPT: &str = "You are a research editor. Be factual and concise.";

pub struct ResearcherNode {
  research: Arc<dyn ResearchProvider>,
  generation: Arc<dyn GenerationProvider>,
  config: Arc<PipelineConfig>,
}

impl ResearcherNode {
  pub fn new(
    research: Arc<dyn ResearchProvider>,
    generation: Arc<dyn GenerationProvider>,
    config: Arc<PipelineConfig>,
  ) -> Self {
    Self {
      research,
      generation,
      config,
    }
  }

  /// Searches, retrying rate-limited calls with doubling delays.
  async fn search_with_backoff(&self, state: &WorkflowState) -> Result<Vec<SearchResult>, PipelineError> {
    let mut delay = self.config.research_initial_backoff();
    let mut attempt = 1;
    loop {
      match self.research.search(&state.topic, &state.keywords).await {
        Ok(results) => return Ok(results),
        Err(e) if e.is_retryable() && attempt < self.config.research_max_attempts => {
          warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "research rate limited, backing off");
          tokio::time::sleep(delay).await;
          delay *= 2;
          attempt += 1;
        }
        Err(e) => return Err(PipelineError::provider(NodeName::Researcher, e)),
      }
    }
  }
}

/// Keeps the first result per URL, in order.
fn distinct_by_url(results: Vec<SearchResult>) -> Vec<SearchResult> {
  let mut seen = HashSet::new();
  results
    .into_iter()
    .filter(|r| seen.insert(r.url.clone()))
    .collect()
}

fn source_list(sources: &[SearchResult]) -> String {
  sources
    .iter()
    .enumerate()
    .map(|(i, s)| format!("{}. **{}**\n   {}\n   {}", i + 1, s.title, s.url, s.summary))
    .collect::<Vec<_>>()
    .join("\n")
}

#[async_trait]
impl PipelineNode for ResearcherNode {
  fn name(&self) -> NodeName {
    NodeName::Researcher
  }

  #[instrument(level = "trace", skip(self, state, _resume), fields(session_id = %state.session_id))]
  async fn run(
    &self,
    state: &WorkflowState,
    _resume: Option<Resumed<'_>>,
  ) -> Result<NodeOutcome, PipelineError> {
    let (results, cache_insert) = match state.search_cache.get(&state.topic) {
      Some(cached) => {
        debug!(sources = cached.len(), "research cache hit");
        let results: Vec<SearchResult> = cached
          .iter()
          .map(|c| SearchResult {
            title: c.title.clone(),
            url: c.url.clone(),
            summary: c.summary.clone(),
            text: String::new(),
          })
          .collect();
        (results, None)
      }
      None => {
        let results = distinct_by_url(self.search_with_backoff(state).await?);
        let trimmed: Vec<CachedSource> = results
          .iter()
          .map(|r| CachedSource {
            title: r.title.clone(),
            url: r.url.clone(),
            summary: r.summary.clone(),
          })
          .collect();
        (results, Some((state.topic.clone(), trimmed)))
      }
    };

    let sources = distinct_by_url(results);
    if sources.len() < self.config.min_research_sources {
      return Err(PipelineError::InsufficientSources {
        found: sources.len(),
        required: self.config.min_research_sources,
      });
    }

    let synthesis = self
      .generation
      .generate(GenerationRequest {
        system_prompt: SYSTEM_PROMPT.to_string(),
        user_prompt: research_synthesis_prompt(&state.topic, &state.keywords, &sources, &self.config.language),
        max_tokens: self.config.research_max_tokens,
        temperature: self.config.research_temperature,
        model: Some(self.config.research_model.clone()),
      })
      .await
      .map_err(|e| PipelineError::provider(self.name(), e))?;

    info!(sources = sources.len(), "research report ready");
    let report = format!(
      "## Research report: {}\n\n### Synthesis\n\n{}\n\n### Sources\n\n{}",
      state.topic,
      synthesis.trim(),
      source_list(&sources)
    );
    Ok(NodeOutcome::update(StateUpdate {
      cache_insert,
      research_report: Some(report),
      ..Default::default()
    }))
  }
}
