//! Strictly validated resume values.
//!
//! Callers hand the engine untyped JSON. [ResumeValue::parse] accepts exactly the
//! shapes the pending [ResumeSchema] allows and rejects everything else, including
//! truthy strings, numbers and unknown fields.

use serde_json::{Map, Value};

use super::ResumeSchema;

/// Reviewer feedback attached to a rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
  Outline {
    edited_outline: Option<String>,
    note: Option<String>,
  },
  Draft {
    feedback: String,
  },
}

/// A validated reply to an interrupt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeValue {
  Confirm(bool),
  Approve,
  Reject(Rejection),
  Abort,
}

impl ResumeValue {
  /// Validates `raw` against `schema`; the error describes the violation.
  pub fn parse(schema: ResumeSchema, raw: &Value) -> Result<Self, String> {
    match schema {
      ResumeSchema::Confirm => match raw {
        Value::Bool(b) => Ok(ResumeValue::Confirm(*b)),
        other => Err(format!("expected a JSON boolean, got {}", kind_of(other))),
      },
      ResumeSchema::OutlineReview => parse_decision(raw, &["edited_outline", "note"], |obj| {
        Ok(Rejection::Outline {
          edited_outline: optional_string(obj, "edited_outline")?,
          note: optional_string(obj, "note")?,
        })
      }),
      ResumeSchema::DraftReview => parse_decision(raw, &["feedback"], |obj| {
        let feedback = optional_string(obj, "feedback")?
          .ok_or_else(|| "reject requires a `feedback` string".to_string())?;
        Ok(Rejection::Draft { feedback })
      }),
    }
  }
}

fn parse_decision(
  raw: &Value,
  reject_fields: &[&str],
  rejection: impl FnOnce(&Map<String, Value>) -> Result<Rejection, String>,
) -> Result<ResumeValue, String> {
  let obj = raw
    .as_object()
    .ok_or_else(|| format!("expected an object with an `action` field, got {}", kind_of(raw)))?;
  let action = obj
    .get("action")
    .and_then(Value::as_str)
    .ok_or_else(|| "missing string field `action`".to_string())?;
  let allowed: &[&str] = match action {
    "approve" | "abort" => &[],
    "reject" => reject_fields,
    other => return Err(format!("unknown action `{}`", other)),
  };
  if let Some(extra) = obj
    .keys()
    .find(|k| k.as_str() != "action" && !allowed.contains(&k.as_str()))
  {
    return Err(format!("field `{}` is not allowed for action `{}`", extra, action));
  }
  match action {
    "approve" => Ok(ResumeValue::Approve),
    "abort" => Ok(ResumeValue::Abort),
    _ => rejection(obj).map(ResumeValue::Reject),
  }
}

fn optional_string(obj: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
  match obj.get(key) {
    None | Some(Value::Null) => Ok(None),
    Some(Value::String(s)) => Ok(Some(s.clone())),
    Some(other) => Err(format!("`{}` must be a string, got {}", key, kind_of(other))),
  }
}

fn kind_of(v: &Value) -> &'static str {
  match v {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
