//! # Connectivity Capabilities
//!
//! Every node composes exactly one output-side and one input-side contract:
//!
//! | Capability            | Side   | Ports                                   |
//! |-----------------------|--------|-----------------------------------------|
//! | `UpStreamable`        | output | grows on demand, one slot per target    |
//! | `NotUpStreamable`     | output | none, assigning a target is an error    |
//! | `MonoDownStreamable`  | input  | exactly one, reassigning detaches       |
//! | `MultiDownStreamable` | input  | grows on demand, duplicates rejected    |
//! | `NotDownStreamable`   | input  | none, assigning a source is an error    |
//!
//! Sources are `UpStreamable + NotDownStreamable`, targets are
//! `NotUpStreamable + MonoDownStreamable`. A node with neither inputs nor
//! outputs could never take part in a flow, so that pairing is refused.

use crate::error::BuildError;
use crate::graph::NodeId;

/// One of the five connectivity contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
  /// Dynamically growing output ports.
  UpStreamable,
  /// No output port.
  NotUpStreamable,
  /// A single input port.
  MonoDownStreamable,
  /// Dynamically growing input ports.
  MultiDownStreamable,
  /// No input port.
  NotDownStreamable,
}

impl Capability {
  fn is_output_side(self) -> bool {
    matches!(self, Capability::UpStreamable | Capability::NotUpStreamable)
  }
}

/// Output-side contract of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outputs {
  /// Any number of targets.
  Growable,
  /// No target at all.
  None,
}

/// Input-side contract of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inputs {
  /// Exactly one source.
  Single,
  /// Any number of distinct sources.
  Growable,
  /// No source at all.
  None,
}

/// A validated pair of connectivity contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
  outputs: Outputs,
  inputs: Inputs,
}

impl Capabilities {
  /// Entry points of the graph.
  pub const SOURCE: Capabilities = Capabilities {
    outputs: Outputs::Growable,
    inputs: Inputs::None,
  };
  /// Exit points of the graph.
  pub const TARGET: Capabilities = Capabilities {
    outputs: Outputs::None,
    inputs: Inputs::Single,
  };
  /// One input, any number of outputs.
  pub const ONE_TO_MANY: Capabilities = Capabilities {
    outputs: Outputs::Growable,
    inputs: Inputs::Single,
  };
  /// Any number of inputs and outputs.
  pub const MANY_TO_MANY: Capabilities = Capabilities {
    outputs: Outputs::Growable,
    inputs: Inputs::Growable,
  };

  /// Composes one output-side and one input-side capability, in any order.
  pub fn compose(a: Capability, b: Capability) -> Result<Self, BuildError> {
    let (output, input) = match (a.is_output_side(), b.is_output_side()) {
      (true, false) => (a, b),
      (false, true) => (b, a),
      _ => return Err(BuildError::IncompatibleCapabilities(a, b)),
    };

    let outputs = match output {
      Capability::UpStreamable => Outputs::Growable,
      _ => Outputs::None,
    };
    let inputs = match input {
      Capability::MonoDownStreamable => Inputs::Single,
      Capability::MultiDownStreamable => Inputs::Growable,
      _ => Inputs::None,
    };

    if outputs == Outputs::None && inputs == Inputs::None {
      return Err(BuildError::IncompatibleCapabilities(a, b));
    }
    Ok(Self { outputs, inputs })
  }

  /// The output-side and input-side contracts this pair was composed from.
  pub fn contracts(&self) -> (Capability, Capability) {
    let output = match self.outputs {
      Outputs::Growable => Capability::UpStreamable,
      Outputs::None => Capability::NotUpStreamable,
    };
    let input = match self.inputs {
      Inputs::Single => Capability::MonoDownStreamable,
      Inputs::Growable => Capability::MultiDownStreamable,
      Inputs::None => Capability::NotDownStreamable,
    };
    (output, input)
  }

  /// Checks the pair again through [`Capabilities::compose`].
  pub fn validate(self) -> Result<Self, BuildError> {
    let (output, input) = self.contracts();
    Self::compose(output, input)
  }

  /// Output-side contract.
  pub fn outputs(&self) -> Outputs {
    self.outputs
  }

  /// Input-side contract.
  pub fn inputs(&self) -> Inputs {
    self.inputs
  }

  /// Whether targets may be attached.
  pub fn is_upstreamable(&self) -> bool {
    self.outputs == Outputs::Growable
  }

  /// Whether sources may be attached.
  pub fn is_downstreamable(&self) -> bool {
    self.inputs != Inputs::None
  }

  /// Nodes without inputs are graph roots.
  pub fn is_root(&self) -> bool {
    self.inputs == Inputs::None
  }

  /// Nodes without outputs terminate a flow.
  pub fn is_leaf(&self) -> bool {
    self.outputs == Outputs::None
  }
}

/// Indexed port slots of one side of a node.
///
/// A slot is either empty or holds the neighbour on the other end of the
/// edge. Detached slots are reused before the table grows.
#[derive(Debug, Clone, Default)]
pub(crate) struct PortTable {
  slots: Vec<Option<NodeId>>,
}

impl PortTable {
  pub(crate) fn contains(&self, id: NodeId) -> bool {
    self.slots.contains(&Some(id))
  }

  pub(crate) fn port_of(&self, id: NodeId) -> Option<usize> {
    self.slots.iter().position(|s| *s == Some(id))
  }

  /// Attaches `id` to the first free slot, extending the table by one if
  /// every slot is taken. Returns the port index.
  pub(crate) fn attach(&mut self, id: NodeId) -> usize {
    match self.slots.iter().position(Option::is_none) {
      Some(port) => {
        self.slots[port] = Some(id);
        port
      }
      None => {
        self.slots.push(Some(id));
        self.slots.len() - 1
      }
    }
  }

  pub(crate) fn detach(&mut self, id: NodeId) -> Option<usize> {
    let port = self.port_of(id)?;
    self.slots[port] = None;
    Some(port)
  }

  /// Connected neighbours in port order.
  pub(crate) fn connected(&self) -> impl Iterator<Item = NodeId> + '_ {
    self.slots.iter().filter_map(|s| *s)
  }

  pub(crate) fn count(&self) -> usize {
    self.connected().count()
  }

  pub(crate) fn first(&self) -> Option<NodeId> {
    self.connected().next()
  }
}
