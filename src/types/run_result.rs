//! Result of driving a session until it completes or pauses.

use super::{InterruptRequest, WorkflowState};

/// What `start`, `resume` and `retry` hand back when they do not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum RunResult {
  /// Cursor reached the terminal marker.
  Completed(WorkflowState),
  /// A node is waiting for a reviewer decision.
  Paused(InterruptRequest),
}

impl RunResult {
  pub fn is_completed(&self) -> bool {
    matches!(self, RunResult::Completed(_))
  }

  pub fn interrupt(&self) -> Option<&InterruptRequest> {
    match self {
      RunResult::Paused(req) => Some(req),
      RunResult::Completed(_) => None,
    }
  }

  pub fn state(&self) -> Option<&WorkflowState> {
    match self {
      RunResult::Completed(s) => Some(s),
      RunResult::Paused(_) => None,
    }
  }
}
