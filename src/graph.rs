//! # Workflow Graph
//!
//! A directed acyclic graph of [`Transformation`]s. Nodes live in an arena and
//! refer to each other by [`NodeId`]; a name index gives access by node name.
//!
//! ## Structure
//!
//! - Roots are the nodes without input capability (sources). They are the
//!   starting points of every traversal.
//! - Edges are stored twice: in the output port table of the producer and in
//!   the input port table of the consumer.
//! - Connections are checked before anything is mutated, so a rejected
//!   connection leaves the graph untouched.
//!
//! ## Traversals
//!
//! [`Graph::bfs_traverse`] visits every node reachable from a root once, in
//! breadth-first order. [`Graph::bfs_traverse_links`] visits every edge
//! leaving such a node once, handing the producer and the consumer to the
//! callback.
//!
//! ## Reachability
//!
//! [`Graph::check_reachability`] walks, for every node, backward to a root and
//! forward to a leaf. Dead ends are reported by the name of the node where the
//! walk got stuck.

use crate::capability::{Capabilities, Inputs};
use crate::error::{BuildError, BuildWarning};
use crate::transformation::{Operator, Transformation};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// Index of a node in its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// The DAG container.
#[derive(Debug, Default)]
pub struct Graph {
  nodes: Vec<Transformation>,
  index: HashMap<String, NodeId>,
  roots: Vec<NodeId>,
}

impl Graph {
  /// Creates an empty graph.
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of nodes.
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  /// Whether the graph holds no node.
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Whether a node is registered under `name`.
  pub fn contains(&self, name: &str) -> bool {
    self.index.contains_key(name)
  }

  /// Identifier of the node called `name`.
  pub fn id_of(&self, name: &str) -> Result<NodeId, BuildError> {
    self
      .index
      .get(name)
      .copied()
      .ok_or_else(|| BuildError::NodeNotFound(name.to_string()))
  }

  /// The node called `name`.
  pub fn get(&self, name: &str) -> Option<&Transformation> {
    self.index.get(name).map(|id| &self.nodes[id.0])
  }

  /// The node called `name`, mutably.
  pub fn get_mut(&mut self, name: &str) -> Option<&mut Transformation> {
    let id = *self.index.get(name)?;
    Some(&mut self.nodes[id.0])
  }

  /// The node with identifier `id`.
  pub fn node(&self, id: NodeId) -> &Transformation {
    &self.nodes[id.0]
  }

  /// Every node, in insertion order.
  pub fn nodes(&self) -> impl Iterator<Item = &Transformation> {
    self.nodes.iter()
  }

  /// Every node, mutably.
  pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Transformation> {
    self.nodes.iter_mut()
  }

  /// Names of the root nodes, in insertion order.
  pub fn roots(&self) -> Vec<&str> {
    self.roots.iter().map(|id| self.nodes[id.0].name()).collect()
  }

  /// Whether `name` is a root.
  pub fn is_root(&self, name: &str) -> bool {
    self.index.get(name).is_some_and(|id| self.roots.contains(id))
  }

  /// Names of the sources of `name`, in input port order.
  pub fn sources_of(&self, name: &str) -> Result<Vec<&str>, BuildError> {
    let id = self.id_of(name)?;
    Ok(
      self.nodes[id.0]
        .inputs
        .connected()
        .map(|s| self.nodes[s.0].name())
        .collect(),
    )
  }

  /// Names of the targets of `name`, in output port order.
  pub fn targets_of(&self, name: &str) -> Result<Vec<&str>, BuildError> {
    let id = self.id_of(name)?;
    Ok(
      self.nodes[id.0]
        .outputs
        .connected()
        .map(|t| self.nodes[t.0].name())
        .collect(),
    )
  }

  /// Registers a node and attaches it to `parents`.
  ///
  /// Every check happens before the node is inserted: on error the graph is
  /// unchanged. Warnings raised by the parents (e.g. a dispatcher receiving
  /// more targets than it can feed) are returned.
  pub fn insert_node(
    &mut self,
    name: &str,
    operator: Box<dyn Operator>,
    parents: &[NodeId],
  ) -> Result<(NodeId, Vec<BuildWarning>), BuildError> {
    self.insert_between(name, operator, parents, &[])
  }

  /// Registers a node fed by `parents` and feeding `children`.
  ///
  /// Links to both sides are checked up front, so either the node is inserted
  /// with all its edges or the graph is left unchanged.
  pub fn insert_between(
    &mut self,
    name: &str,
    operator: Box<dyn Operator>,
    parents: &[NodeId],
    children: &[NodeId],
  ) -> Result<(NodeId, Vec<BuildWarning>), BuildError> {
    if self.index.contains_key(name) {
      return Err(BuildError::NodeAlreadyExists(name.to_string()));
    }
    let capabilities = operator.capabilities().validate()?;
    self.check_parents(name, capabilities, parents)?;
    self.check_children(name, capabilities, parents, children)?;

    let id = NodeId(self.nodes.len());
    self
      .nodes
      .push(Transformation::new(id, name.to_string(), operator));
    self.index.insert(name.to_string(), id);
    if capabilities.is_root() {
      self.roots.push(id);
    }
    debug!(node = %name, "inserted node");

    let mut warnings: Vec<_> = parents
      .iter()
      .filter_map(|parent| self.link(*parent, id))
      .collect();
    for child in children {
      warnings.extend(self.connect(id, *child)?);
    }
    Ok((id, warnings))
  }

  fn check_parents(
    &self,
    name: &str,
    capabilities: Capabilities,
    parents: &[NodeId],
  ) -> Result<(), BuildError> {
    if parents.is_empty() {
      return Ok(());
    }
    if !capabilities.is_downstreamable() {
      return Err(BuildError::NotDownstreamable(name.to_string()));
    }
    if capabilities.inputs() == Inputs::Single && parents.len() > 1 {
      return Err(BuildError::SingleSource(name.to_string()));
    }
    let mut seen = HashSet::new();
    for parent in parents {
      let node = &self.nodes[parent.0];
      if !seen.insert(*parent) {
        return Err(BuildError::DuplicatedSource {
          node: name.to_string(),
          parent: node.name().to_string(),
        });
      }
      if !node.capabilities().is_upstreamable() {
        return Err(BuildError::NotUpstreamable(node.name().to_string()));
      }
    }
    Ok(())
  }

  /// Runs the checks of [`Graph::connect`] for the edges from a node not yet
  /// inserted to each of `children`.
  fn check_children(
    &self,
    name: &str,
    capabilities: Capabilities,
    parents: &[NodeId],
    children: &[NodeId],
  ) -> Result<(), BuildError> {
    let mut seen = HashSet::new();
    for child in children {
      let node = &self.nodes[child.0];
      if !node.capabilities().is_downstreamable() {
        return Err(BuildError::NotDownstreamable(node.name().to_string()));
      }
      if !capabilities.is_upstreamable() {
        return Err(BuildError::NotUpstreamable(name.to_string()));
      }
      if parents.iter().any(|parent| self.reaches(*child, *parent)) {
        return Err(BuildError::CycleDetected {
          producer: name.to_string(),
          consumer: node.name().to_string(),
        });
      }
      if !seen.insert(*child) && node.capabilities().inputs() == Inputs::Growable {
        return Err(BuildError::DuplicatedSource {
          node: node.name().to_string(),
          parent: name.to_string(),
        });
      }
    }
    Ok(())
  }

  /// Makes `producer` a source of `consumer`.
  ///
  /// A single-input consumer is detached from its previous source first,
  /// which is reported as [`BuildWarning::ParentReset`].
  pub fn connect(
    &mut self,
    producer: NodeId,
    consumer: NodeId,
  ) -> Result<Vec<BuildWarning>, BuildError> {
    let (p, c) = (&self.nodes[producer.0], &self.nodes[consumer.0]);
    if !c.capabilities().is_downstreamable() {
      return Err(BuildError::NotDownstreamable(c.name().to_string()));
    }
    if !p.capabilities().is_upstreamable() {
      return Err(BuildError::NotUpstreamable(p.name().to_string()));
    }
    if producer == consumer || self.reaches(consumer, producer) {
      return Err(BuildError::CycleDetected {
        producer: p.name().to_string(),
        consumer: c.name().to_string(),
      });
    }

    let mut warnings = Vec::new();
    match c.capabilities().inputs() {
      Inputs::Growable => {
        if c.inputs.contains(producer) {
          return Err(BuildError::DuplicatedSource {
            node: c.name().to_string(),
            parent: p.name().to_string(),
          });
        }
      }
      _ => {
        if let Some(previous) = c.inputs.first() {
          self.unlink(previous, consumer);
          let warning = BuildWarning::ParentReset {
            node: self.nodes[consumer.0].name().to_string(),
            previous: self.nodes[previous.0].name().to_string(),
          };
          warn!("{}", warning);
          warnings.push(warning);
        }
      }
    }

    warnings.extend(self.link(producer, consumer));
    Ok(warnings)
  }

  fn link(&mut self, producer: NodeId, consumer: NodeId) -> Option<BuildWarning> {
    let input = self.nodes[consumer.0].inputs.attach(producer);
    let output = self.nodes[producer.0].outputs.attach(consumer);
    debug!(
      producer = %self.nodes[producer.0].name(),
      output,
      consumer = %self.nodes[consumer.0].name(),
      input,
      "linked nodes"
    );
    let warning = self.nodes[producer.0].on_target_added();
    if let Some(warning) = &warning {
      warn!("{}", warning);
    }
    warning
  }

  fn unlink(&mut self, producer: NodeId, consumer: NodeId) {
    self.nodes[consumer.0].inputs.detach(producer);
    self.nodes[producer.0].outputs.detach(consumer);
  }

  /// Whether a forward path leads from `from` to `to`.
  fn reaches(&self, from: NodeId, to: NodeId) -> bool {
    let mut stack = vec![from];
    let mut visited = HashSet::new();
    while let Some(id) = stack.pop() {
      if id == to {
        return true;
      }
      if visited.insert(id) {
        stack.extend(self.nodes[id.0].outputs.connected());
      }
    }
    false
  }

  /// Reports every node from which no root can be reached backward and
  /// every node from which no leaf can be reached forward.
  ///
  /// Each node is walked on its own. A dead end is reported once even when
  /// several walks run into it.
  pub fn check_reachability(&self, mut report: impl FnMut(BuildError)) {
    let mut reported = HashSet::new();
    let mut emit = |error: BuildError| {
      if reported.insert(error.clone()) {
        report(error);
      }
    };

    for node in &self.nodes {
      self.walk(node.id(), Direction::Backward, &mut emit);
      self.walk(node.id(), Direction::Forward, &mut emit);
    }
  }

  fn walk(&self, start: NodeId, direction: Direction, emit: &mut impl FnMut(BuildError)) {
    let mut stack = vec![start];
    let mut visited = HashSet::new();
    while let Some(id) = stack.pop() {
      if !visited.insert(id) {
        continue;
      }
      let node = &self.nodes[id.0];
      let (ports, at_end, error): (_, bool, fn(String) -> BuildError) = match direction {
        Direction::Backward => (
          &node.inputs,
          node.capabilities().is_root(),
          BuildError::UnconnectedToSource,
        ),
        Direction::Forward => (
          &node.outputs,
          node.capabilities().is_leaf(),
          BuildError::UnconnectedToTarget,
        ),
      };
      if ports.count() > 0 {
        stack.extend(ports.connected());
      } else if !at_end {
        emit(error(node.name().to_string()));
      }
    }
  }

  /// Node identifiers in breadth-first order from the roots.
  pub fn bfs_order(&self) -> Vec<NodeId> {
    let mut order = Vec::new();
    let mut queue: VecDeque<NodeId> = self.roots.iter().copied().collect();
    let mut visited = HashSet::new();
    while let Some(id) = queue.pop_front() {
      if !visited.insert(id) {
        continue;
      }
      order.push(id);
      queue.extend(self.nodes[id.0].outputs.connected());
    }
    order
  }

  /// Edges in breadth-first order from the roots, as `(producer, consumer)`.
  pub fn bfs_links(&self) -> Vec<(NodeId, NodeId)> {
    self
      .bfs_order()
      .into_iter()
      .flat_map(|id| {
        self.nodes[id.0]
          .outputs
          .connected()
          .map(move |target| (id, target))
      })
      .collect()
  }

  /// Calls `visit` on every node reachable from a root, breadth first.
  /// Stops at the first error.
  pub fn bfs_traverse<E>(
    &mut self,
    mut visit: impl FnMut(&mut Transformation) -> Result<(), E>,
  ) -> Result<(), E> {
    for id in self.bfs_order() {
      visit(&mut self.nodes[id.0])?;
    }
    Ok(())
  }

  /// Calls `visit` with producer and consumer of every edge leaving a node
  /// reachable from a root, breadth first. Stops at the first error.
  pub fn bfs_traverse_links<E>(
    &mut self,
    mut visit: impl FnMut(&mut Transformation, &mut Transformation) -> Result<(), E>,
  ) -> Result<(), E> {
    for (producer, consumer) in self.bfs_links() {
      let (p, c) = self.pair_mut(producer, consumer);
      visit(p, c)?;
    }
    Ok(())
  }

  fn pair_mut(&mut self, a: NodeId, b: NodeId) -> (&mut Transformation, &mut Transformation) {
    if a.0 < b.0 {
      let (left, right) = self.nodes.split_at_mut(b.0);
      (&mut left[a.0], &mut right[0])
    } else {
      let (left, right) = self.nodes.split_at_mut(a.0);
      (&mut right[0], &mut left[b.0])
    }
  }
}

#[derive(Clone, Copy)]
enum Direction {
  Backward,
  Forward,
}
