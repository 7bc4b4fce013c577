//! Error types for the engine, providers, stores and configuration.

use thiserror::Error;

use crate::types::{NodeName, SessionId};

/// Whether a provider failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
  /// Transient rate limiting; retried with backoff where a node allows it.
  RateLimited,
  /// Anything else; propagates immediately.
  Permanent,
}

/// Failure reported by an external provider.
#[derive(Debug, Clone, Error)]
#[error("{provider} provider error ({kind:?}): {message}")]
pub struct ProviderError {
  pub kind: ProviderErrorKind,
  pub provider: String,
  pub message: String,
}

impl ProviderError {
  pub fn rate_limited(provider: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      kind: ProviderErrorKind::RateLimited,
      provider: provider.into(),
      message: message.into(),
    }
  }

  pub fn permanent(provider: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      kind: ProviderErrorKind::Permanent,
      provider: provider.into(),
      message: message.into(),
    }
  }

  pub fn is_retryable(&self) -> bool {
    self.kind == ProviderErrorKind::RateLimited
  }
}

/// Checkpoint store or metadata log failure.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("store io: {0}")]
  Io(#[from] std::io::Error),
  #[error("checkpoint (de)serialization: {0}")]
  Serialization(#[from] serde_json::Error),
  #[error("database: {0}")]
  Database(#[from] sqlx::Error),
}

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("reading config file: {0}")]
  Io(#[from] std::io::Error),
  #[error("parsing config file: {0}")]
  Parse(#[from] serde_json::Error),
  #[error("environment variable {key}: cannot parse {value:?}")]
  Env { key: String, value: String },
  #[error("invalid config: {0}")]
  Invalid(String),
}

/// Errors surfaced by the engine to `start`/`resume`/`retry` callers.
#[derive(Debug, Error)]
pub enum PipelineError {
  /// The resume value does not match the pending interrupt's schema. State is unchanged.
  #[error("invalid resume value for {node}: {reason}")]
  InvalidResume { node: NodeName, reason: String },

  #[error("session {0} already exists")]
  AlreadyExists(SessionId),

  #[error("session {0} not found")]
  NotFound(SessionId),

  #[error("session {0} has no pending interrupt")]
  NoPendingInterrupt(SessionId),

  #[error("session {0} is already being driven by another call")]
  SessionBusy(SessionId),

  #[error("{node} failed: {source}")]
  Provider {
    node: NodeName,
    #[source]
    source: ProviderError,
  },

  #[error("research produced {found} distinct sources, at least {required} required")]
  InsufficientSources { found: usize, required: usize },

  #[error("invariant violated: {0}")]
  InvariantViolation(String),

  #[error("node registry incomplete: no implementation for {0}")]
  IncompleteRegistry(NodeName),

  #[error("exceeded {0} steps in a single call")]
  StepLimitExceeded(u32),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Config(#[from] ConfigError),
}

impl PipelineError {
  pub fn provider(node: NodeName, source: ProviderError) -> Self {
    PipelineError::Provider { node, source }
  }
}
