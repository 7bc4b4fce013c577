//! Fakes and fixtures shared by the integration tests. Built on the public API only.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use editorial_pipeline::providers::{
  GenerationProvider, GenerationRequest, InMemoryMetadataLog, InMemorySimilarityIndex,
  ResearchProvider, SearchResult,
};
use editorial_pipeline::store::CheckpointStore;
use editorial_pipeline::{
  Engine, PipelineConfig, ProviderError, Providers, RunResult, SessionId, WorkflowState,
};

pub const TOPIC: &str = "Jak zwiększyć ruch na blogu firmowym";
pub const PRIMARY: &str = "SEO blog";

pub fn keywords() -> Vec<String> {
  ["SEO blog", "content marketing", "ruch organiczny"]
    .into_iter()
    .map(String::from)
    .collect()
}

pub fn initial_state(id: &SessionId) -> WorkflowState {
  WorkflowState::new(id.clone(), TOPIC, keywords())
}

/// Fast config with no low-corpus pause.
pub fn config() -> PipelineConfig {
  PipelineConfig {
    research_initial_backoff_ms: 1,
    low_corpus_threshold: 0,
    ..Default::default()
  }
}

/// A draft that passes validation for [PRIMARY] under the default rules.
pub fn valid_draft() -> String {
  let meta = format!("{PRIMARY} krok po kroku: jak zwiększyć ruch organiczny na blogu firmowym dzięki danym, planowi treści i regularnym publikacjom w 2026 roku!!");
  let meta: String = meta.chars().chain(std::iter::repeat('!')).take(155).collect();
  let filler = vec!["treść"; 850].join(" ");
  format!(
    "Meta-description: {meta}\n\n# {PRIMARY} bez tajemnic\n\n{PRIMARY} przyciąga czytelników.\n\n## Plan działania\n\n{filler}\n"
  )
}

/// Generation fake: one fixed answer, every request recorded.
pub struct FixedGeneration {
  answer: String,
  requests: Mutex<Vec<GenerationRequest>>,
}

impl FixedGeneration {
  pub fn new(answer: impl Into<String>) -> Self {
    Self {
      answer: answer.into(),
      requests: Mutex::new(vec![]),
    }
  }

  pub fn calls(&self) -> usize {
    self.requests.lock().unwrap().len()
  }

  /// Calls made with the draft model, i.e. by the Writer.
  pub fn writer_calls(&self) -> usize {
    let draft_model = PipelineConfig::default().draft_model;
    self
      .requests
      .lock()
      .unwrap()
      .iter()
      .filter(|r| r.model.as_deref() == Some(draft_model.as_str()))
      .count()
  }
}

#[async_trait]
impl GenerationProvider for FixedGeneration {
  async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError> {
    self.requests.lock().unwrap().push(request);
    Ok(self.answer.clone())
  }
}

pub struct FixedResearch {
  results: Vec<SearchResult>,
  calls: Mutex<usize>,
}

impl FixedResearch {
  pub fn new(n: usize) -> Self {
    Self {
      results: (1..=n)
        .map(|i| SearchResult {
          title: format!("Poradnik {i}"),
          url: format!("https://blog.example.pl/{i}"),
          summary: format!("Streszczenie {i}"),
          text: String::new(),
        })
        .collect(),
      calls: Mutex::new(0),
    }
  }

  pub fn calls(&self) -> usize {
    *self.calls.lock().unwrap()
  }
}

#[async_trait]
impl ResearchProvider for FixedResearch {
  async fn search(&self, _topic: &str, _keywords: &[String]) -> Result<Vec<SearchResult>, ProviderError> {
    *self.calls.lock().unwrap() += 1;
    Ok(self.results.clone())
  }
}

pub struct Harness {
  pub research: Arc<FixedResearch>,
  pub generation: Arc<FixedGeneration>,
  pub index: Arc<InMemorySimilarityIndex>,
  pub metadata_log: Arc<InMemoryMetadataLog>,
}

impl Harness {
  pub fn new(draft: impl Into<String>) -> Self {
    Self {
      research: Arc::new(FixedResearch::new(4)),
      generation: Arc::new(FixedGeneration::new(draft)),
      index: Arc::new(InMemorySimilarityIndex::new()),
      metadata_log: Arc::new(InMemoryMetadataLog::new()),
    }
  }

  pub fn providers(&self) -> Providers {
    Providers {
      research: self.research.clone(),
      generation: self.generation.clone(),
      index: self.index.clone(),
      metadata_log: self.metadata_log.clone(),
    }
  }

  pub fn engine(&self, store: Arc<dyn CheckpointStore>, config: PipelineConfig) -> Engine {
    Engine::standard(&self.providers(), store, Arc::new(config)).unwrap()
  }
}

/// Answers every pause with its auto-approve value until the session completes.
pub async fn run_to_completion(engine: &Engine, id: &SessionId, mut result: RunResult) -> WorkflowState {
  loop {
    match result {
      RunResult::Completed(state) => return state,
      RunResult::Paused(request) => {
        result = engine
          .resume(id.clone(), request.schema.auto_approve())
          .await
          .unwrap();
      }
    }
  }
}
