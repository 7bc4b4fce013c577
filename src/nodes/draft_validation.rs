//! Hard content constraints every generated draft is checked against.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::PipelineConfig;

static THINKING: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?s)<thinking>.*?</thinking>").expect("valid regex literal"));
static META_LINE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)^(?:meta[- ]?description|meta opis)[:\s]+(.+)$").expect("valid regex literal")
});
static H1_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#\s+").expect("valid regex literal"));

/// One validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftCheck {
  KeywordInH1,
  KeywordInFirstParagraph,
  SingleMetaDescription,
  MetaDescriptionLength,
  WordCount,
  ForbiddenWords,
}

impl fmt::Display for DraftCheck {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      DraftCheck::KeywordInH1 => "keyword_in_h1",
      DraftCheck::KeywordInFirstParagraph => "keyword_in_first_paragraph",
      DraftCheck::SingleMetaDescription => "single_meta_description",
      DraftCheck::MetaDescriptionLength => "meta_description_length",
      DraftCheck::WordCount => "word_count",
      DraftCheck::ForbiddenWords => "forbidden_words",
    })
  }
}

/// Limits applied by [validate_draft].
#[derive(Debug, Clone, PartialEq)]
pub struct DraftRules {
  pub min_word_count: usize,
  pub meta_min_chars: usize,
  pub meta_max_chars: usize,
  pub forbidden_stems: Vec<String>,
}

impl DraftRules {
  pub fn from_config(config: &PipelineConfig) -> Self {
    Self {
      min_word_count: config.min_word_count,
      meta_min_chars: config.meta_description_min_chars,
      meta_max_chars: config.meta_description_max_chars,
      forbidden_stems: config
        .forbidden_stems
        .iter()
        .map(|s| s.to_lowercase())
        .collect(),
    }
  }
}

/// Outcome of validating one draft.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftReport {
  failures: Vec<DraftCheck>,
  /// Body words, excluding headings and the meta-description line.
  pub word_count: usize,
  pub meta_description: Option<String>,
  /// Forbidden stems found in the draft.
  pub forbidden_hits: Vec<String>,
}

impl DraftReport {
  pub fn passed(&self) -> bool {
    self.failures.is_empty()
  }

  pub fn failures(&self) -> &[DraftCheck] {
    &self.failures
  }
}

/// Removes `<thinking>...</thinking>` planning blocks and surrounding whitespace.
pub fn strip_thinking(text: &str) -> String {
  THINKING.replace_all(text, "").trim().to_string()
}

fn meta_text(line: &str) -> Option<&str> {
  META_LINE
    .captures(line.trim())
    .and_then(|c| c.get(1))
    .map(|m| m.as_str().trim())
}

fn is_heading(line: &str) -> bool {
  line.trim_start().starts_with('#')
}

/// Checks `draft` against every rule; `primary_keyword` matching is case-insensitive.
pub fn validate_draft(draft: &str, primary_keyword: &str, rules: &DraftRules) -> DraftReport {
  let keyword = primary_keyword.to_lowercase();
  let mut failures = Vec::new();

  let h1 = draft.lines().find(|l| H1_LINE.is_match(l));
  if !h1.is_some_and(|h| h.to_lowercase().contains(&keyword)) {
    failures.push(DraftCheck::KeywordInH1);
  }

  let metas: Vec<&str> = draft.lines().filter_map(meta_text).collect();
  let body: Vec<&str> = draft
    .lines()
    .filter(|l| !l.trim().is_empty() && !is_heading(l) && meta_text(l).is_none())
    .collect();

  if !body
    .first()
    .is_some_and(|p| p.to_lowercase().contains(&keyword))
  {
    failures.push(DraftCheck::KeywordInFirstParagraph);
  }

  let meta_description = match metas.as_slice() {
    [only] => {
      let chars = only.chars().count();
      if chars < rules.meta_min_chars || chars > rules.meta_max_chars {
        failures.push(DraftCheck::MetaDescriptionLength);
      }
      Some(only.to_string())
    }
    _ => {
      failures.push(DraftCheck::SingleMetaDescription);
      None
    }
  };

  let word_count = body.iter().map(|l| l.split_whitespace().count()).sum();
  if word_count < rules.min_word_count {
    failures.push(DraftCheck::WordCount);
  }

  let lowered = draft.to_lowercase();
  let forbidden_hits: Vec<String> = rules
    .forbidden_stems
    .iter()
    .filter(|stem| !stem.is_empty() && lowered.contains(stem.as_str()))
    .cloned()
    .collect();
  if !forbidden_hits.is_empty() {
    failures.push(DraftCheck::ForbiddenWords);
  }

  DraftReport {
    failures,
    word_count,
    meta_description,
    forbidden_hits,
  }
}
