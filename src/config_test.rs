//! Tests for `PipelineConfig`.

use std::collections::HashMap;

use crate::config::PipelineConfig;
use crate::error::ConfigError;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
  let map: HashMap<String, String> = pairs
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
  move |key: &str| map.get(key).cloned()
}

#[test]
fn defaults_are_valid() {
  let c = PipelineConfig::default();
  assert!(c.validate().is_ok());
  assert_eq!(c.cp2_soft_cap, 3);
  assert_eq!(c.writer_max_attempts, 3);
  assert_eq!(c.low_corpus_threshold, 10);
  assert_eq!(c.min_word_count, 800);
  assert!((c.duplicate_threshold - 0.85).abs() < f64::EPSILON);
  assert!(c.forbidden_stems.iter().any(|s| s == "innowacyjn"));
}

#[test]
fn env_overrides_fields() {
  let mut c = PipelineConfig::default();
  c.apply_env(env(&[
    ("EDITORIAL_DUPLICATE_THRESHOLD", "0.9"),
    ("EDITORIAL_MIN_WORD_COUNT", " 1200 "),
    ("EDITORIAL_DRAFT_MODEL", "claude-sonnet"),
    ("EDITORIAL_BRAND_CONTEXT", "Engineering studio"),
  ]))
  .unwrap();
  assert!((c.duplicate_threshold - 0.9).abs() < f64::EPSILON);
  assert_eq!(c.min_word_count, 1200);
  assert_eq!(c.draft_model, "claude-sonnet");
  assert_eq!(c.brand_context.as_deref(), Some("Engineering studio"));
}

#[test]
fn env_parse_error_names_key() {
  let mut c = PipelineConfig::default();
  let err = c
    .apply_env(env(&[("EDITORIAL_CP2_SOFT_CAP", "three")]))
    .unwrap_err();
  match err {
    ConfigError::Env { key, value } => {
      assert_eq!(key, "EDITORIAL_CP2_SOFT_CAP");
      assert_eq!(value, "three");
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[test]
fn validate_rejects_out_of_range() {
  let mut c = PipelineConfig::default();
  c.duplicate_threshold = 1.5;
  assert!(c.validate().is_err());

  let mut c = PipelineConfig::default();
  c.writer_max_attempts = 0;
  assert!(c.validate().is_err());

  let mut c = PipelineConfig::default();
  c.meta_description_min_chars = 200;
  assert!(c.validate().is_err());
}

#[test]
fn file_config_fills_missing_fields_with_defaults() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("config.json");
  std::fs::write(&path, r#"{"min_word_count": 300, "cp2_soft_cap": 5}"#).unwrap();
  let c = PipelineConfig::from_file(&path).unwrap();
  assert_eq!(c.min_word_count, 300);
  assert_eq!(c.cp2_soft_cap, 5);
  assert_eq!(c.writer_max_attempts, 3);
}

#[test]
fn missing_file_is_io_error() {
  let dir = tempfile::tempdir().unwrap();
  let r = PipelineConfig::from_file(&dir.path().join("nope.json"));
  assert!(matches!(r, Err(ConfigError::Io(_))));
}
