//! # editorial-pipeline
//!
//! A pausable, restart-safe editorial content pipeline driven as a checkpointed state
//! machine.
//!
//! ## Architecture
//!
//! Seven stages (see `nodes`) run one at a time per session:
//!
//! Duplicate Check → Researcher → Structure → Gate 1 → Writer → Gate 2 → Metadata Publisher
//!
//! Gates loop back on rejection. The [runner::Engine] persists a [types::Checkpoint] after
//! every stage and every interrupt through a [store::CheckpointStore], so a session paused
//! for human review can be resumed by a different process.

pub mod config;
#[cfg(test)]
mod config_test;
pub mod error;
pub mod graph;
pub mod nodes;
pub mod prompts;
pub mod providers;
pub mod runner;
pub mod store;
pub mod types;

pub use config::PipelineConfig;
pub use error::{ConfigError, PipelineError, ProviderError, ProviderErrorKind, StoreError};
pub use graph::NodeRegistry;
pub use nodes::{PipelineNode, Providers};
pub use runner::Engine;
pub use types::{Checkpoint, InterruptRequest, NodeName, ResumeSchema, RunResult, SessionId, WorkflowState};
