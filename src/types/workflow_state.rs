//! Per-session workflow state and the partial updates nodes emit.
//!
//! Nodes never mutate [WorkflowState] directly. They return a [StateUpdate], which the
//! engine merges with [WorkflowState::apply]. The update type has no fields for the
//! creation-time inputs, can only insert into the search cache, and expresses the
//! review iteration counters as increments, so those invariants hold by construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::SessionId;

/// Closest previously published topic found by the duplicate check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateMatch {
  pub existing_title: String,
  pub existing_date: String,
  /// Similarity in `[0, 1]`, rounded to 3 decimals.
  pub similarity: f64,
}

/// A research result with the bulky full text dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSource {
  pub title: String,
  pub url: String,
  pub summary: String,
}

/// State of one pipeline session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
  pub topic: String,
  pub keywords: Vec<String>,
  pub session_id: SessionId,
  /// Optional run-specific context injected into generation prompts.
  #[serde(default)]
  pub brief: Option<String>,

  pub duplicate_match: Option<DuplicateMatch>,
  pub duplicate_override: Option<bool>,

  pub search_cache: BTreeMap<String, Vec<CachedSource>>,
  pub research_report: Option<String>,
  pub heading_structure: Option<String>,

  pub cp1_approved: Option<bool>,
  pub cp1_feedback: Option<String>,
  pub cp1_iterations: u32,

  pub draft: Option<String>,
  pub draft_validated: Option<bool>,

  pub cp2_approved: Option<bool>,
  pub cp2_feedback: Option<String>,
  pub cp2_iterations: u32,

  pub metadata_saved: bool,
}

impl WorkflowState {
  pub fn new(session_id: SessionId, topic: impl Into<String>, keywords: Vec<String>) -> Self {
    Self {
      topic: topic.into(),
      keywords,
      session_id,
      brief: None,
      duplicate_match: None,
      duplicate_override: None,
      search_cache: BTreeMap::new(),
      research_report: None,
      heading_structure: None,
      cp1_approved: None,
      cp1_feedback: None,
      cp1_iterations: 0,
      draft: None,
      draft_validated: None,
      cp2_approved: None,
      cp2_feedback: None,
      cp2_iterations: 0,
      metadata_saved: false,
    }
  }

  pub fn with_brief(mut self, brief: impl Into<String>) -> Self {
    self.brief = Some(brief.into());
    self
  }

  /// First keyword, or the topic when no keywords were given.
  pub fn primary_keyword(&self) -> &str {
    self
      .keywords
      .first()
      .map(String::as_str)
      .unwrap_or(&self.topic)
  }

  /// Merges a node's partial update into this state.
  pub fn apply(&mut self, update: StateUpdate) {
    if let Some(m) = update.duplicate_match {
      self.duplicate_match = m;
    }
    if let Some(o) = update.duplicate_override {
      self.duplicate_override = o;
    }
    if let Some((topic, sources)) = update.cache_insert {
      self.search_cache.entry(topic).or_insert(sources);
    }
    if let Some(r) = update.research_report {
      self.research_report = Some(r);
    }
    if let Some(h) = update.heading_structure {
      self.heading_structure = Some(h);
    }
    if let Some(a) = update.cp1_approved {
      self.cp1_approved = Some(a);
    }
    if let Some(f) = update.cp1_feedback {
      self.cp1_feedback = Some(f);
    }
    if update.cp1_rejected {
      self.cp1_iterations += 1;
    }
    if let Some(d) = update.draft {
      self.draft = d;
    }
    if let Some(v) = update.draft_validated {
      self.draft_validated = Some(v);
    }
    if let Some(a) = update.cp2_approved {
      self.cp2_approved = Some(a);
    }
    if let Some(f) = update.cp2_feedback {
      self.cp2_feedback = Some(f);
    }
    if update.cp2_rejected {
      self.cp2_iterations += 1;
    }
    if update.metadata_saved {
      self.metadata_saved = true;
    }
  }
}

/// Partial state produced by one node execution.
///
/// `None` leaves a field untouched. Nullable state fields use `Option<Option<_>>` so a
/// node can explicitly clear them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
  pub duplicate_match: Option<Option<DuplicateMatch>>,
  pub duplicate_override: Option<Option<bool>>,
  /// Cache entry to add; an existing key is never overwritten.
  pub cache_insert: Option<(String, Vec<CachedSource>)>,
  pub research_report: Option<String>,
  pub heading_structure: Option<String>,
  pub cp1_approved: Option<bool>,
  pub cp1_feedback: Option<String>,
  /// Bumps `cp1_iterations` by exactly one.
  pub cp1_rejected: bool,
  pub draft: Option<Option<String>>,
  pub draft_validated: Option<bool>,
  pub cp2_approved: Option<bool>,
  pub cp2_feedback: Option<String>,
  /// Bumps `cp2_iterations` by exactly one.
  pub cp2_rejected: bool,
  pub metadata_saved: bool,
}

impl StateUpdate {
  pub fn is_empty(&self) -> bool {
    *self == StateUpdate::default()
  }
}
