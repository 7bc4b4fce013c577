//! Pipeline topology: the entry node, the routing table and the node registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::nodes::{
  DraftReviewGate, DuplicateCheckNode, MetadataPublisherNode, OutlineReviewGate, PipelineNode,
  Providers, ResearcherNode, StructureNode, WriterNode,
};
use crate::types::{Cursor, NodeName, WorkflowState};

/// First node of every session.
pub const ENTRY: NodeName = NodeName::DuplicateCheck;

/// Next cursor after `from` completed normally with `state` already merged.
///
/// Aborts bypass this table: the engine sends them straight to [Cursor::Terminal].
pub fn route(from: NodeName, state: &WorkflowState) -> Cursor {
  match from {
    NodeName::DuplicateCheck if state.duplicate_override == Some(false) => Cursor::Terminal,
    NodeName::DuplicateCheck => Cursor::Node(NodeName::Researcher),
    NodeName::Researcher => Cursor::Node(NodeName::Structure),
    NodeName::Structure => Cursor::Node(NodeName::CheckpointGate1),
    NodeName::CheckpointGate1 if state.cp1_approved == Some(true) => Cursor::Node(NodeName::Writer),
    NodeName::CheckpointGate1 => Cursor::Node(NodeName::Structure),
    NodeName::Writer => Cursor::Node(NodeName::CheckpointGate2),
    NodeName::CheckpointGate2 if state.cp2_approved == Some(true) => {
      Cursor::Node(NodeName::MetadataPublisher)
    }
    NodeName::CheckpointGate2 => Cursor::Node(NodeName::Writer),
    NodeName::MetadataPublisher => Cursor::Terminal,
  }
}

/// Node implementations keyed by name. Built once, then owned immutably by the engine.
#[derive(Clone, Default)]
pub struct NodeRegistry {
  nodes: HashMap<NodeName, Arc<dyn PipelineNode>>,
}

impl NodeRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers `node` under its own name, replacing any earlier registration.
  pub fn register(mut self, node: impl PipelineNode + 'static) -> Self {
    self.nodes.insert(node.name(), Arc::new(node));
    self
  }

  pub fn register_arc(mut self, node: Arc<dyn PipelineNode>) -> Self {
    self.nodes.insert(node.name(), node);
    self
  }

  /// The seven standard stages wired to `providers`.
  pub fn standard(providers: &Providers, config: Arc<PipelineConfig>) -> Self {
    Self::new()
      .register(DuplicateCheckNode::new(providers.index.clone(), config.clone()))
      .register(ResearcherNode::new(
        providers.research.clone(),
        providers.generation.clone(),
        config.clone(),
      ))
      .register(StructureNode::new(providers.generation.clone(), config.clone()))
      .register(OutlineReviewGate::new())
      .register(WriterNode::new(
        providers.generation.clone(),
        providers.index.clone(),
        config.clone(),
      ))
      .register(DraftReviewGate::new(config))
      .register(MetadataPublisherNode::new(
        providers.metadata_log.clone(),
        providers.index.clone(),
      ))
  }

  pub fn get(&self, name: NodeName) -> Option<&Arc<dyn PipelineNode>> {
    self.nodes.get(&name)
  }

  /// Fails on the first node name with no implementation.
  pub fn validate(&self) -> Result<(), PipelineError> {
    match NodeName::ALL.iter().find(|n| !self.nodes.contains_key(*n)) {
      Some(missing) => Err(PipelineError::IncompleteRegistry(*missing)),
      None => Ok(()),
    }
  }
}
