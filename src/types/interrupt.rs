//! Interrupt requests raised by nodes that need a human decision.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::NodeName;

/// Shape of the resume value a pending interrupt accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeSchema {
  /// A bare JSON boolean: `true` proceeds, `false` declines.
  Confirm,
  /// Outline review: approve, reject with optional edited outline and note, or abort.
  OutlineReview,
  /// Draft review: approve, reject with feedback, or abort.
  DraftReview,
}

impl ResumeSchema {
  /// Machine-readable description of accepted values, attached to interrupt payloads.
  pub fn describe(&self) -> Value {
    match self {
      ResumeSchema::Confirm => json!({
        "type": "boolean",
        "accepts": [true, false],
      }),
      ResumeSchema::OutlineReview => json!({
        "type": "object",
        "accepts": [
          { "action": "approve" },
          { "action": "reject", "edited_outline": "string (optional)", "note": "string (optional)" },
          { "action": "abort" },
        ],
      }),
      ResumeSchema::DraftReview => json!({
        "type": "object",
        "accepts": [
          { "action": "approve" },
          { "action": "reject", "feedback": "string" },
          { "action": "abort" },
        ],
      }),
    }
  }

  /// The value an unattended run answers with: approve, or proceed.
  pub fn auto_approve(&self) -> Value {
    match self {
      ResumeSchema::Confirm => Value::Bool(true),
      ResumeSchema::OutlineReview | ResumeSchema::DraftReview => json!({ "action": "approve" }),
    }
  }
}

/// A pause requested by a node; persisted verbatim in the checkpoint until resumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptRequest {
  pub node: NodeName,
  pub schema: ResumeSchema,
  /// Structured data for the reviewer.
  pub payload: Value,
}

impl InterruptRequest {
  /// Builds a request; the schema description is added to the payload under `accepts`.
  pub fn new(node: NodeName, schema: ResumeSchema, mut payload: Value) -> Self {
    if let Value::Object(ref mut map) = payload {
      map.insert("accepts".to_string(), schema.describe());
    }
    Self {
      node,
      schema,
      payload,
    }
  }
}
