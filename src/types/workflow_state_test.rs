//! Tests for `WorkflowState` and `StateUpdate`.

use super::{CachedSource, DuplicateMatch, SessionId, StateUpdate, WorkflowState};

fn state() -> WorkflowState {
  WorkflowState::new(
    SessionId::new("s1"),
    "Jak zwiększyć ruch na blogu firmowym",
    vec!["ruch na blogu".to_string(), "SEO".to_string()],
  )
}

fn source(url: &str) -> CachedSource {
  CachedSource {
    title: "t".to_string(),
    url: url.to_string(),
    summary: "s".to_string(),
  }
}

#[test]
fn new_state_defaults() {
  let s = state();
  assert_eq!(s.cp1_iterations, 0);
  assert_eq!(s.cp2_iterations, 0);
  assert!(!s.metadata_saved);
  assert!(s.draft_validated.is_none());
  assert!(s.search_cache.is_empty());
}

#[test]
fn primary_keyword_falls_back_to_topic() {
  assert_eq!(state().primary_keyword(), "ruch na blogu");
  let s = WorkflowState::new(SessionId::new("s2"), "Temat", vec![]);
  assert_eq!(s.primary_keyword(), "Temat");
}

#[test]
fn empty_update_changes_nothing() {
  let mut s = state();
  let before = s.clone();
  let u = StateUpdate::default();
  assert!(u.is_empty());
  s.apply(u);
  assert_eq!(s, before);
}

#[test]
fn rejection_bumps_counter_by_one() {
  let mut s = state();
  s.apply(StateUpdate {
    cp1_approved: Some(false),
    cp1_feedback: Some("fb".to_string()),
    cp1_rejected: true,
    ..Default::default()
  });
  assert_eq!(s.cp1_iterations, 1);
  assert_eq!(s.cp1_approved, Some(false));
  s.apply(StateUpdate {
    cp2_rejected: true,
    ..Default::default()
  });
  s.apply(StateUpdate {
    cp2_rejected: true,
    ..Default::default()
  });
  assert_eq!(s.cp2_iterations, 2);
  assert_eq!(s.cp1_iterations, 1);
}

#[test]
fn cache_insert_never_overwrites() {
  let mut s = state();
  s.apply(StateUpdate {
    cache_insert: Some(("topic".to_string(), vec![source("a")])),
    ..Default::default()
  });
  s.apply(StateUpdate {
    cache_insert: Some(("topic".to_string(), vec![source("b")])),
    ..Default::default()
  });
  s.apply(StateUpdate {
    cache_insert: Some(("other".to_string(), vec![source("c")])),
    ..Default::default()
  });
  assert_eq!(s.search_cache.len(), 2);
  assert_eq!(s.search_cache["topic"][0].url, "a");
}

#[test]
fn nullable_fields_can_be_cleared() {
  let mut s = state();
  s.draft = Some("old".to_string());
  s.duplicate_match = Some(DuplicateMatch {
    existing_title: "x".to_string(),
    existing_date: "2024-01-01".to_string(),
    similarity: 0.9,
  });
  s.apply(StateUpdate {
    draft: Some(None),
    duplicate_match: Some(None),
    draft_validated: Some(false),
    ..Default::default()
  });
  assert!(s.draft.is_none());
  assert!(s.duplicate_match.is_none());
  assert_eq!(s.draft_validated, Some(false));
}

#[test]
fn metadata_saved_is_sticky() {
  let mut s = state();
  s.apply(StateUpdate {
    metadata_saved: true,
    ..Default::default()
  });
  s.apply(StateUpdate::default());
  assert!(s.metadata_saved);
}

#[test]
fn state_roundtrip_serde() {
  let mut s = state().with_brief("VR training simulators");
  s.search_cache.insert("k".to_string(), vec![source("u")]);
  let json = serde_json::to_string(&s).unwrap();
  let back: WorkflowState = serde_json::from_str(&json).unwrap();
  assert_eq!(back, s);
}
