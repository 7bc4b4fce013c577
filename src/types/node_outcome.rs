//! Result of executing a single pipeline node.

use super::{InterruptRequest, StateUpdate};

/// What a node asks the engine to do after it ran.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
  /// Merge the update and follow the routing table.
  Update(StateUpdate),
  /// Persist and pause until a reviewer resumes.
  Interrupt(InterruptRequest),
  /// Merge the update and jump straight to the terminal state.
  Abort(StateUpdate),
}

impl NodeOutcome {
  pub fn update(update: StateUpdate) -> Self {
    NodeOutcome::Update(update)
  }

  pub fn abort() -> Self {
    NodeOutcome::Abort(StateUpdate::default())
  }

  pub fn is_interrupt(&self) -> bool {
    matches!(self, NodeOutcome::Interrupt(_))
  }
}
