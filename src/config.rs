//! Pipeline configuration.
//!
//! Precedence, lowest first: built-in defaults, an optional JSON file, `EDITORIAL_*`
//! environment variables, then whatever the caller (usually the CLI) overrides.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::ConfigError;

/// Stems of overused filler words; matching a stem catches every inflected form.
pub const DEFAULT_FORBIDDEN_STEMS: [&str; 9] = [
  "nowoczesn",
  "innowacyjn",
  "kompleksow",
  "rewolucyjn",
  "przełomow",
  "wyjątkow",
  "niesamowit",
  "fantastyczn",
  "ekscytując",
];

/// Tunables for every node and for the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Similarity at or above which a published topic counts as a duplicate.
  pub duplicate_threshold: f64,
  /// Style corpus size below which the writer asks for confirmation.
  pub low_corpus_threshold: usize,
  pub min_word_count: usize,
  pub meta_description_min_chars: usize,
  pub meta_description_max_chars: usize,
  pub forbidden_stems: Vec<String>,
  /// Draft review iterations after which the reviewer is warned.
  pub cp2_soft_cap: u32,
  pub writer_max_attempts: u32,
  pub exemplar_count: usize,
  pub exemplar_min_own: usize,
  pub own_source_type: String,
  pub min_research_sources: usize,
  pub research_max_attempts: u32,
  pub research_initial_backoff_ms: u64,
  pub research_model: String,
  pub draft_model: String,
  pub research_max_tokens: u32,
  pub structure_max_tokens: u32,
  pub draft_max_tokens: u32,
  pub research_temperature: f32,
  pub draft_temperature: f32,
  /// Language the generated content is written in.
  pub language: String,
  /// Static brand description injected into prompts.
  pub brand_context: Option<String>,
  /// Upper bound on nodes executed by one `start`/`resume`/`retry` call.
  pub max_steps_per_call: u32,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      duplicate_threshold: 0.85,
      low_corpus_threshold: 10,
      min_word_count: 800,
      meta_description_min_chars: 150,
      meta_description_max_chars: 160,
      forbidden_stems: DEFAULT_FORBIDDEN_STEMS.iter().map(|s| s.to_string()).collect(),
      cp2_soft_cap: 3,
      writer_max_attempts: 3,
      exemplar_count: 5,
      exemplar_min_own: 3,
      own_source_type: "own".to_string(),
      min_research_sources: 3,
      research_max_attempts: 3,
      research_initial_backoff_ms: 1000,
      research_model: "gpt-4o-mini".to_string(),
      draft_model: "gpt-4o".to_string(),
      research_max_tokens: 1200,
      structure_max_tokens: 800,
      draft_max_tokens: 4096,
      research_temperature: 0.3,
      draft_temperature: 0.7,
      language: "Polish".to_string(),
      brand_context: None,
      max_steps_per_call: 100,
    }
  }
}

impl PipelineConfig {
  /// Defaults, then `path` (if any), then environment variables; validated.
  #[instrument(level = "trace")]
  pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
    let mut config = match path {
      Some(p) => Self::from_file(p)?,
      None => Self::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
  }

  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
  }

  /// Overrides fields from `EDITORIAL_*` variables resolved through `lookup`.
  pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
    env_override(&lookup, "EDITORIAL_DUPLICATE_THRESHOLD", &mut self.duplicate_threshold)?;
    env_override(&lookup, "EDITORIAL_LOW_CORPUS_THRESHOLD", &mut self.low_corpus_threshold)?;
    env_override(&lookup, "EDITORIAL_MIN_WORD_COUNT", &mut self.min_word_count)?;
    env_override(&lookup, "EDITORIAL_CP2_SOFT_CAP", &mut self.cp2_soft_cap)?;
    env_override(&lookup, "EDITORIAL_WRITER_MAX_ATTEMPTS", &mut self.writer_max_attempts)?;
    env_override(&lookup, "EDITORIAL_RESEARCH_MAX_ATTEMPTS", &mut self.research_max_attempts)?;
    env_override(
      &lookup,
      "EDITORIAL_RESEARCH_BACKOFF_MS",
      &mut self.research_initial_backoff_ms,
    )?;
    env_override(&lookup, "EDITORIAL_RESEARCH_MODEL", &mut self.research_model)?;
    env_override(&lookup, "EDITORIAL_DRAFT_MODEL", &mut self.draft_model)?;
    env_override(&lookup, "EDITORIAL_LANGUAGE", &mut self.language)?;
    if let Some(brand) = lookup("EDITORIAL_BRAND_CONTEXT") {
      self.brand_context = Some(brand);
    }
    Ok(())
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&self.duplicate_threshold) {
      return Err(ConfigError::Invalid(format!(
        "duplicate_threshold must be within [0, 1], got {}",
        self.duplicate_threshold
      )));
    }
    if self.writer_max_attempts == 0 || self.research_max_attempts == 0 {
      return Err(ConfigError::Invalid(
        "attempt counts must be at least 1".to_string(),
      ));
    }
    if self.meta_description_min_chars > self.meta_description_max_chars {
      return Err(ConfigError::Invalid(
        "meta_description_min_chars exceeds meta_description_max_chars".to_string(),
      ));
    }
    if self.exemplar_min_own > self.exemplar_count {
      return Err(ConfigError::Invalid(
        "exemplar_min_own exceeds exemplar_count".to_string(),
      ));
    }
    if self.max_steps_per_call == 0 {
      return Err(ConfigError::Invalid(
        "max_steps_per_call must be at least 1".to_string(),
      ));
    }
    Ok(())
  }

  pub fn research_initial_backoff(&self) -> Duration {
    Duration::from_millis(self.research_initial_backoff_ms)
  }
}

fn env_override<T: FromStr>(
  lookup: &impl Fn(&str) -> Option<String>,
  key: &str,
  field: &mut T,
) -> Result<(), ConfigError> {
  if let Some(value) = lookup(key) {
    *field = value.trim().parse().map_err(|_| ConfigError::Env {
      key: key.to_string(),
      value,
    })?;
  }
  Ok(())
}
