//! Names of the pipeline stages and the execution cursor.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the seven pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeName {
  DuplicateCheck,
  Researcher,
  Structure,
  #[serde(rename = "checkpoint_gate_1")]
  CheckpointGate1,
  Writer,
  #[serde(rename = "checkpoint_gate_2")]
  CheckpointGate2,
  MetadataPublisher,
}

impl NodeName {
  /// All stages in their nominal (first-pass) order.
  pub const ALL: [NodeName; 7] = [
    NodeName::DuplicateCheck,
    NodeName::Researcher,
    NodeName::Structure,
    NodeName::CheckpointGate1,
    NodeName::Writer,
    NodeName::CheckpointGate2,
    NodeName::MetadataPublisher,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      NodeName::DuplicateCheck => "duplicate_check",
      NodeName::Researcher => "researcher",
      NodeName::Structure => "structure",
      NodeName::CheckpointGate1 => "checkpoint_gate_1",
      NodeName::Writer => "writer",
      NodeName::CheckpointGate2 => "checkpoint_gate_2",
      NodeName::MetadataPublisher => "metadata_publisher",
    }
  }
}

impl fmt::Display for NodeName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for NodeName {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    NodeName::ALL
      .into_iter()
      .find(|n| n.as_str() == s)
      .ok_or_else(|| format!("unknown node name: {}", s))
  }
}

/// Where execution continues for a session: a node, or the terminal marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "node", rename_all = "snake_case")]
pub enum Cursor {
  Node(NodeName),
  Terminal,
}

impl Cursor {
  pub fn is_terminal(&self) -> bool {
    matches!(self, Cursor::Terminal)
  }

  pub fn node(&self) -> Option<NodeName> {
    match self {
      Cursor::Node(n) => Some(*n),
      Cursor::Terminal => None,
    }
  }
}

impl fmt::Display for Cursor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Cursor::Node(n) => write!(f, "{}", n),
      Cursor::Terminal => f.write_str("terminal"),
    }
  }
}
