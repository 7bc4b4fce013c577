//! Checkpoint for resumable execution.

use serde::{Deserialize, Serialize};

use super::{Cursor, InterruptRequest, NodeName, SessionId, WorkflowState};

/// Durable snapshot of a session: state, cursor, and any pending interrupt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
  pub session_id: SessionId,
  pub state: WorkflowState,
  pub cursor: Cursor,
  pub pending_interrupt: Option<InterruptRequest>,
  /// Nodes that completed, in order.
  pub completed_nodes: Vec<NodeName>,
  /// Number of persisted steps (completions and interrupts).
  pub step: u64,
}

impl Checkpoint {
  /// Checkpoint for a fresh session positioned at `entry`.
  pub fn initial(state: WorkflowState, entry: NodeName) -> Self {
    Self {
      session_id: state.session_id.clone(),
      state,
      cursor: Cursor::Node(entry),
      pending_interrupt: None,
      completed_nodes: vec![],
      step: 0,
    }
  }

  pub fn is_done(&self) -> bool {
    self.cursor.is_terminal()
  }
}
