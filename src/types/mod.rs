//! Pipeline data model: session state, checkpoints, interrupts and resume values.
//!
//! Everything persisted by a checkpoint store is serde-serializable; the typed
//! [ResumeValue] is only ever produced by validating caller JSON.

mod checkpoint;
mod interrupt;
mod node_name;
mod node_outcome;
mod resume_value;
#[cfg(test)]
mod resume_value_test;
mod run_result;
mod session_id;
mod workflow_state;
#[cfg(test)]
mod workflow_state_test;

pub use checkpoint::Checkpoint;
pub use interrupt::{InterruptRequest, ResumeSchema};
pub use node_name::{Cursor, NodeName};
pub use node_outcome::NodeOutcome;
pub use resume_value::{Rejection, ResumeValue};
pub use run_result::RunResult;
pub use session_id::SessionId;
pub use workflow_state::{CachedSource, DuplicateMatch, StateUpdate, WorkflowState};
