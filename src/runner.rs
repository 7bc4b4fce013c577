//! The state machine engine: drives a session node by node, persisting a checkpoint after
//! every completion and interrupt.
//!
//! - [Engine::start]: create a session and run it until it pauses or completes.
//! - [Engine::resume]: answer the pending interrupt and continue.
//! - [Engine::retry]: re-run the node under the cursor after a failure.
//! - [Engine::checkpoint]: read the stored checkpoint.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::graph::{ENTRY, NodeRegistry, route};
use crate::nodes::{Providers, Resumed};
use crate::store::CheckpointStore;
use crate::types::{
  Checkpoint, Cursor, NodeName, NodeOutcome, ResumeValue, RunResult, SessionId, WorkflowState,
};

/// In-process exclusive locks, one per session. An entry lives only while a call holds it.
#[derive(Debug, Default)]
pub struct SessionLocks {
  locks: Arc<StdMutex<HashMap<SessionId, Arc<Mutex<()>>>>>,
}

impl SessionLocks {
  /// Takes the session's lock without waiting; fails if another call holds it.
  pub fn try_acquire(&self, session_id: &SessionId) -> Result<SessionGuard, PipelineError> {
    let mut map = self
      .locks
      .lock()
      .map_err(|_| PipelineError::InvariantViolation("session lock table poisoned".to_string()))?;
    let lock = map.entry(session_id.clone()).or_default().clone();
    let guard = lock
      .try_lock_owned()
      .map_err(|_| PipelineError::SessionBusy(session_id.clone()))?;
    Ok(SessionGuard {
      session_id: session_id.clone(),
      locks: Arc::clone(&self.locks),
      guard: Some(guard),
    })
  }

  /// Number of sessions with a live entry.
  pub(crate) fn len(&self) -> usize {
    self.locks.lock().map(|map| map.len()).unwrap_or(0)
  }
}

/// Holds a session's lock; releasing the last holder removes the session's entry.
#[derive(Debug)]
pub struct SessionGuard {
  session_id: SessionId,
  locks: Arc<StdMutex<HashMap<SessionId, Arc<Mutex<()>>>>>,
  guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard {
  fn drop(&mut self) {
    drop(self.guard.take());
    let Ok(mut map) = self.locks.lock() else {
      return;
    };
    let idle = map
      .get(&self.session_id)
      .is_some_and(|lock| Arc::strong_count(lock) == 1);
    if idle {
      map.remove(&self.session_id);
    }
  }
}

pub struct Engine {
  registry: NodeRegistry,
  store: Arc<dyn CheckpointStore>,
  config: Arc<PipelineConfig>,
  pub(crate) locks: SessionLocks,
}

impl Engine {
  /// Fails if `registry` lacks any stage or `config` is invalid.
  pub fn new(
    registry: NodeRegistry,
    store: Arc<dyn CheckpointStore>,
    config: Arc<PipelineConfig>,
  ) -> Result<Self, PipelineError> {
    registry.validate()?;
    config.validate()?;
    Ok(Self {
      registry,
      store,
      config,
      locks: SessionLocks::default(),
    })
  }

  /// Engine over the standard stages.
  pub fn standard(
    providers: &Providers,
    store: Arc<dyn CheckpointStore>,
    config: Arc<PipelineConfig>,
  ) -> Result<Self, PipelineError> {
    Self::new(NodeRegistry::standard(providers, config.clone()), store, config)
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  #[instrument(level = "trace", skip(self, initial))]
  pub async fn start(&self, session_id: SessionId, initial: WorkflowState) -> Result<RunResult, PipelineError> {
    let _guard = self.locks.try_acquire(&session_id)?;
    if initial.session_id != session_id {
      return Err(PipelineError::InvariantViolation(format!(
        "initial state belongs to session {}, not {}",
        initial.session_id, session_id
      )));
    }
    if self.store.load(&session_id).await?.is_some() {
      return Err(PipelineError::AlreadyExists(session_id));
    }
    let checkpoint = Checkpoint::initial(initial, ENTRY);
    self.store.save(&session_id, &checkpoint).await?;
    info!(session_id = %session_id, "session started");
    self.drive(checkpoint, None).await
  }

  /// Validates `value` against the pending interrupt's schema, then re-enters that node.
  /// An invalid value fails without touching the stored checkpoint.
  #[instrument(level = "trace", skip(self, value))]
  pub async fn resume(&self, session_id: SessionId, value: Value) -> Result<RunResult, PipelineError> {
    let _guard = self.locks.try_acquire(&session_id)?;
    let checkpoint = self.load(&session_id).await?;
    let Some(pending) = &checkpoint.pending_interrupt else {
      return Err(PipelineError::NoPendingInterrupt(session_id));
    };
    let parsed = ResumeValue::parse(pending.schema, &value).map_err(|reason| {
      warn!(session_id = %session_id, node = %pending.node, %reason, "rejected resume value");
      PipelineError::InvalidResume {
        node: pending.node,
        reason,
      }
    })?;
    info!(session_id = %session_id, node = %pending.node, "resuming");
    self.drive(checkpoint, Some(parsed)).await
  }

  /// Continues from the stored checkpoint: re-runs the cursor node after a failure,
  /// or reports the pending interrupt or the completed state unchanged.
  #[instrument(level = "trace", skip(self))]
  pub async fn retry(&self, session_id: SessionId) -> Result<RunResult, PipelineError> {
    let _guard = self.locks.try_acquire(&session_id)?;
    let checkpoint = self.load(&session_id).await?;
    if let Some(pending) = &checkpoint.pending_interrupt {
      return Ok(RunResult::Paused(pending.clone()));
    }
    self.drive(checkpoint, None).await
  }

  pub async fn checkpoint(&self, session_id: &SessionId) -> Result<Checkpoint, PipelineError> {
    self.load(session_id).await
  }

  async fn load(&self, session_id: &SessionId) -> Result<Checkpoint, PipelineError> {
    self
      .store
      .load(session_id)
      .await?
      .ok_or_else(|| PipelineError::NotFound(session_id.clone()))
  }

  /// Nodes that must not run again once their work is committed.
  fn guard_reentry(node: NodeName, state: &WorkflowState) -> Result<(), PipelineError> {
    match node {
      NodeName::Structure if state.cp1_approved == Some(true) => Err(PipelineError::InvariantViolation(
        "structure cannot run after the outline was approved".to_string(),
      )),
      NodeName::MetadataPublisher if state.metadata_saved => Err(PipelineError::InvariantViolation(
        "metadata was already published for this session".to_string(),
      )),
      _ => Ok(()),
    }
  }

  /// Runs nodes from the checkpoint's cursor until it completes or pauses. Every step is
  /// persisted before the next begins; on error the stored checkpoint is left as it was.
  async fn drive(&self, mut checkpoint: Checkpoint, mut resume: Option<ResumeValue>) -> Result<RunResult, PipelineError> {
    let session_id = checkpoint.session_id.clone();
    let mut steps = 0;
    loop {
      let node_name = match checkpoint.cursor {
        Cursor::Terminal => {
          info!(session_id = %session_id, completed = ?checkpoint.completed_nodes, "session complete");
          return Ok(RunResult::Completed(checkpoint.state));
        }
        Cursor::Node(name) => name,
      };
      if steps >= self.config.max_steps_per_call {
        return Err(PipelineError::StepLimitExceeded(self.config.max_steps_per_call));
      }
      steps += 1;
      Self::guard_reentry(node_name, &checkpoint.state)?;
      let node = self
        .registry
        .get(node_name)
        .ok_or(PipelineError::IncompleteRegistry(node_name))?;

      let resumed = match (&checkpoint.pending_interrupt, &resume) {
        (Some(request), Some(value)) if request.node == node_name => Some(Resumed { request, value }),
        (Some(request), _) => {
          return Err(PipelineError::InvariantViolation(format!(
            "interrupt pending at {} while the cursor is at {}",
            request.node, node_name
          )));
        }
        (None, _) => None,
      };

      info!(session_id = %session_id, node = %node_name, step = checkpoint.step, "executing node");
      let outcome = node.run(&checkpoint.state, resumed).await?;
      resume = None;

      match outcome {
        NodeOutcome::Interrupt(request) => {
          if request.node != node_name {
            return Err(PipelineError::InvariantViolation(format!(
              "{} raised an interrupt on behalf of {}",
              node_name, request.node
            )));
          }
          checkpoint.pending_interrupt = Some(request.clone());
          checkpoint.step += 1;
          self.store.save(&session_id, &checkpoint).await?;
          info!(session_id = %session_id, node = %node_name, "paused for review");
          return Ok(RunResult::Paused(request));
        }
        NodeOutcome::Update(update) => {
          checkpoint.state.apply(update);
          checkpoint.cursor = route(node_name, &checkpoint.state);
        }
        NodeOutcome::Abort(update) => {
          checkpoint.state.apply(update);
          checkpoint.cursor = Cursor::Terminal;
          info!(session_id = %session_id, node = %node_name, "aborted");
        }
      }
      checkpoint.pending_interrupt = None;
      checkpoint.completed_nodes.push(node_name);
      checkpoint.step += 1;
      self.store.save(&session_id, &checkpoint).await?;
      info!(session_id = %session_id, node = %node_name, next = %checkpoint.cursor, "node completed");
    }
  }
}
