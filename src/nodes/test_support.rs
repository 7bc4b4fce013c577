//! Scripted providers and fixtures shared by node and engine unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::Providers;
use crate::error::ProviderError;
use crate::providers::{
  GenerationProvider, GenerationRequest, InMemoryMetadataLog, InMemorySimilarityIndex,
  ResearchProvider, SearchResult,
};
use crate::types::{SessionId, WorkflowState};

pub const TOPIC: &str = "Jak zwiększyć ruch na blogu firmowym";

pub fn keywords() -> Vec<String> {
  vec![
    "SEO blog".to_string(),
    "content marketing".to_string(),
    "ruch organiczny".to_string(),
  ]
}

pub fn state(id: &str) -> WorkflowState {
  WorkflowState::new(SessionId::new(id), TOPIC, keywords())
}

pub fn sources(n: usize) -> Vec<SearchResult> {
  (1..=n)
    .map(|i| SearchResult {
      title: format!("Source {i}"),
      url: format!("https://example.com/{i}"),
      summary: format!("Summary {i}"),
      text: format!("Full text {i}"),
    })
    .collect()
}

/// Meta-description line body of exactly `chars` chars mentioning `keyword`.
pub fn meta_of_len(keyword: &str, chars: usize) -> String {
  let mut meta = format!("{keyword} w praktyce, sprawdzone metody i dane ");
  while meta.chars().count() < chars {
    meta.push('a');
  }
  meta.chars().take(chars).collect()
}

/// A draft passing every check for `keyword` with `words` body words.
pub fn valid_draft(keyword: &str, words: usize) -> String {
  let lead = format!("{keyword} to podstawa strategii treści.");
  let lead_words = lead.split_whitespace().count();
  let filler = vec!["słowo"; words.saturating_sub(lead_words)].join(" ");
  format!(
    "Meta-description: {}\n\n# {keyword} w 2026 roku\n\n{lead}\n\n## Pierwsze kroki\n\n{filler}\n",
    meta_of_len(keyword, 155)
  )
}

/// Generation provider answering from a queue, then with `fallback` forever.
pub struct ScriptedGeneration {
  queue: Mutex<VecDeque<Result<String, ProviderError>>>,
  fallback: String,
  requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGeneration {
  pub fn repeating(text: impl Into<String>) -> Self {
    Self::new(vec![], text)
  }

  pub fn new(queue: Vec<Result<String, ProviderError>>, fallback: impl Into<String>) -> Self {
    Self {
      queue: Mutex::new(queue.into()),
      fallback: fallback.into(),
      requests: Mutex::new(vec![]),
    }
  }

  pub fn calls(&self) -> usize {
    self.requests.lock().unwrap().len()
  }

  pub fn requests(&self) -> Vec<GenerationRequest> {
    self.requests.lock().unwrap().clone()
  }
}

#[async_trait]
impl GenerationProvider for ScriptedGeneration {
  async fn generate(&self, request: GenerationRequest) -> Result<String, ProviderError> {
    self.requests.lock().unwrap().push(request);
    match self.queue.lock().unwrap().pop_front() {
      Some(next) => next,
      None => Ok(self.fallback.clone()),
    }
  }
}

/// Research provider answering from a queue, then with `fallback` forever.
pub struct ScriptedResearch {
  queue: Mutex<VecDeque<Result<Vec<SearchResult>, ProviderError>>>,
  fallback: Vec<SearchResult>,
  calls: Mutex<usize>,
}

impl ScriptedResearch {
  pub fn repeating(results: Vec<SearchResult>) -> Self {
    Self::new(vec![], results)
  }

  pub fn new(
    queue: Vec<Result<Vec<SearchResult>, ProviderError>>,
    fallback: Vec<SearchResult>,
  ) -> Self {
    Self {
      queue: Mutex::new(queue.into()),
      fallback,
      calls: Mutex::new(0),
    }
  }

  pub fn calls(&self) -> usize {
    *self.calls.lock().unwrap()
  }
}

#[async_trait]
impl ResearchProvider for ScriptedResearch {
  async fn search(&self, _topic: &str, _keywords: &[String]) -> Result<Vec<SearchResult>, ProviderError> {
    *self.calls.lock().unwrap() += 1;
    match self.queue.lock().unwrap().pop_front() {
      Some(next) => next,
      None => Ok(self.fallback.clone()),
    }
  }
}

/// Handles to the fakes behind a [Providers] bundle.
pub struct Fakes {
  pub research: Arc<ScriptedResearch>,
  pub generation: Arc<ScriptedGeneration>,
  pub index: Arc<InMemorySimilarityIndex>,
  pub metadata_log: Arc<InMemoryMetadataLog>,
}

impl Fakes {
  pub fn new(research: ScriptedResearch, generation: ScriptedGeneration) -> Self {
    Self {
      research: Arc::new(research),
      generation: Arc::new(generation),
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
}
