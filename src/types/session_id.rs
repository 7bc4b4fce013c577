//! Opaque session identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one pipeline run. Opaque to the engine; stores use it as a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  /// Fresh random (v4) id.
  pub fn generate() -> Self {
    Self(uuid::Uuid::new_v4().to_string())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for SessionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for SessionId {
  fn from(s: &str) -> Self {
    Self::new(s)
  }
}

impl From<String> for SessionId {
  fn from(s: String) -> Self {
    Self(s)
  }
}
