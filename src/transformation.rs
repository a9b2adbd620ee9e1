//! # Transformations
//!
//! A [`Transformation`] is a graph node: a unique name, an [`Operator`]
//! describing what the node does, the port tables linking it to its
//! neighbours, and the channel endpoints it owns during a run.
//!
//! The [`Operator`] trait is the build-time description of a node. It is
//! configured before a run and, once channels are wired, turned into a
//! [`StreamProcessor`] that the executor schedules.

use crate::capability::{Capabilities, PortTable};
use crate::channels::NodeIo;
use crate::configuration::ConfigEntry;
use crate::error::{BuildWarning, ConfigurationError, ExecutionError};
use crate::graph::NodeId;
use crate::processor::StreamProcessor;

/// Build-time description of a node.
pub trait Operator: Send + Sync {
  /// Short operator name, used in logs and run reports.
  fn kind(&self) -> &'static str;

  /// Connectivity contracts of the node.
  fn capabilities(&self) -> Capabilities;

  /// Applies runtime configuration. `entry` is `None` when no configuration
  /// was registered for the node.
  ///
  /// The default reports [`ConfigurationError::NotConfigurable`], which is
  /// tolerated when no entry exists.
  fn configure(
    &mut self,
    node: &str,
    _entry: Option<&ConfigEntry>,
  ) -> Result<(), ConfigurationError> {
    Err(ConfigurationError::NotConfigurable(node.to_string()))
  }

  /// Releases whatever `configure` acquired.
  fn reset(&mut self) {}

  /// Called after a target was attached, with the new number of targets.
  fn on_target_added(&self, _node: &str, _targets: usize) -> Option<BuildWarning> {
    None
  }

  /// Builds the run-time processor owning `io`.
  fn processor(&self, io: NodeIo) -> Result<Box<dyn StreamProcessor>, ExecutionError>;
}

/// A node of the workflow graph.
pub struct Transformation {
  id: NodeId,
  name: String,
  operator: Box<dyn Operator>,
  capabilities: Capabilities,
  pub(crate) inputs: PortTable,
  pub(crate) outputs: PortTable,
  io: NodeIo,
}

impl std::fmt::Debug for Transformation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Transformation")
      .field("name", &self.name)
      .field("kind", &self.operator.kind())
      .field("inputs", &self.inputs)
      .field("outputs", &self.outputs)
      .finish()
  }
}

impl Transformation {
  pub(crate) fn new(id: NodeId, name: String, operator: Box<dyn Operator>) -> Self {
    let capabilities = operator.capabilities();
    let io = NodeIo::new(name.clone());
    Self {
      id,
      name,
      operator,
      capabilities,
      inputs: PortTable::default(),
      outputs: PortTable::default(),
      io,
    }
  }

  /// Identifier of the node in its graph.
  pub fn id(&self) -> NodeId {
    self.id
  }

  /// Unique name of the node.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Operator kind.
  pub fn kind(&self) -> &'static str {
    self.operator.kind()
  }

  /// Connectivity contracts.
  pub fn capabilities(&self) -> Capabilities {
    self.capabilities
  }

  /// Whether at least one source is attached.
  pub fn has_source(&self) -> bool {
    self.inputs.count() > 0
  }

  /// Whether at least one target is attached.
  pub fn has_target(&self) -> bool {
    self.outputs.count() > 0
  }

  /// Input port linked to `producer`.
  pub fn input_port_of(&self, producer: NodeId) -> Option<usize> {
    self.inputs.port_of(producer)
  }

  /// Output port linked to `consumer`.
  pub fn output_port_of(&self, consumer: NodeId) -> Option<usize> {
    self.outputs.port_of(consumer)
  }

  /// Applies runtime configuration to the operator.
  pub fn configure(&mut self, entry: Option<&ConfigEntry>) -> Result<(), ConfigurationError> {
    self.operator.configure(&self.name, entry)
  }

  /// Resets the operator's runtime configuration.
  pub fn reset(&mut self) {
    self.operator.reset();
  }

  /// Channel endpoints being wired for the next run.
  pub fn io_mut(&mut self) -> &mut NodeIo {
    &mut self.io
  }

  /// Drops every channel endpoint.
  pub fn clear_io(&mut self) {
    self.io = NodeIo::new(self.name.clone());
  }

  /// Hands the wired endpoints over to a new processor.
  pub fn processor(&mut self) -> Result<Box<dyn StreamProcessor>, ExecutionError> {
    let io = std::mem::replace(&mut self.io, NodeIo::new(self.name.clone()));
    self.operator.processor(io)
  }

  pub(crate) fn on_target_added(&self) -> Option<BuildWarning> {
    self.operator.on_target_added(&self.name, self.outputs.count())
  }
}
