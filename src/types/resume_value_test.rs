//! Tests for `ResumeValue::parse`.

use serde_json::json;

use super::{Rejection, ResumeSchema, ResumeValue};

#[test]
fn confirm_accepts_only_booleans() {
  assert_eq!(
    ResumeValue::parse(ResumeSchema::Confirm, &json!(true)),
    Ok(ResumeValue::Confirm(true))
  );
  assert_eq!(
    ResumeValue::parse(ResumeSchema::Confirm, &json!(false)),
    Ok(ResumeValue::Confirm(false))
  );
  for bad in [json!("true"), json!(1), json!(null), json!({"action": "approve"}), json!([true])] {
    assert!(ResumeValue::parse(ResumeSchema::Confirm, &bad).is_err(), "{}", bad);
  }
}

#[test]
fn outline_review_approve_and_abort() {
  assert_eq!(
    ResumeValue::parse(ResumeSchema::OutlineReview, &json!({"action": "approve"})),
    Ok(ResumeValue::Approve)
  );
  assert_eq!(
    ResumeValue::parse(ResumeSchema::OutlineReview, &json!({"action": "abort"})),
    Ok(ResumeValue::Abort)
  );
}

#[test]
fn outline_review_reject_fields_optional() {
  assert_eq!(
    ResumeValue::parse(ResumeSchema::OutlineReview, &json!({"action": "reject"})),
    Ok(ResumeValue::Reject(Rejection::Outline {
      edited_outline: None,
      note: None,
    }))
  );
  let v = ResumeValue::parse(
    ResumeSchema::OutlineReview,
    &json!({"action": "reject", "edited_outline": "# H1", "note": "shorter"}),
  )
  .unwrap();
  assert_eq!(
    v,
    ResumeValue::Reject(Rejection::Outline {
      edited_outline: Some("# H1".to_string()),
      note: Some("shorter".to_string()),
    })
  );
}

#[test]
fn draft_review_reject_requires_feedback() {
  assert!(ResumeValue::parse(ResumeSchema::DraftReview, &json!({"action": "reject"})).is_err());
  assert_eq!(
    ResumeValue::parse(
      ResumeSchema::DraftReview,
      &json!({"action": "reject", "feedback": "section 2 is vague"})
    ),
    Ok(ResumeValue::Reject(Rejection::Draft {
      feedback: "section 2 is vague".to_string()
    }))
  );
}

#[test]
fn decision_rejects_loose_shapes() {
  let bad = [
    json!(true),
    json!("approve"),
    json!("yes"),
    json!({"approved": true}),
    json!({"action": "APPROVE"}),
    json!({"action": "approve", "note": "x"}),
    json!({"action": true}),
    json!({"action": "reject", "feedback": 3}),
  ];
  for v in bad {
    assert!(
      ResumeValue::parse(ResumeSchema::DraftReview, &v).is_err(),
      "accepted {}",
      v
    );
  }
}

#[test]
fn draft_fields_not_accepted_for_outline_review() {
  let r = ResumeValue::parse(
    ResumeSchema::OutlineReview,
    &json!({"action": "reject", "feedback": "x"}),
  );
  assert!(r.unwrap_err().contains("feedback"));
}

#[test]
fn auto_approve_values_validate() {
  for schema in [
    ResumeSchema::Confirm,
    ResumeSchema::OutlineReview,
    ResumeSchema::DraftReview,
  ] {
    let v = ResumeValue::parse(schema, &schema.auto_approve()).unwrap();
    assert!(matches!(v, ResumeValue::Approve | ResumeValue::Confirm(true)));
  }
}
