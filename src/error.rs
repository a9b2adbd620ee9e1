//! # Error Types
//!
//! Every failure the engine can report, grouped by the phase that detects it:
//!
//! - [`BuildError`] / [`BuildWarning`]: graph construction and structural
//!   validation. Errors make a workflow invalid; warnings are recorded for
//!   inspection only.
//! - [`ConfigurationError`]: applying a [`Configuration`](crate::Configuration)
//!   to the nodes of a workflow, before any data flows.
//! - [`ExecutionError`]: failures inside a run. The first one aborts the run.
//! - [`AdapterError`]: failures raised by external I/O adapters.
//! - [`WorkflowError`]: what the workflow façade returns when asked to run.
//!
//! User functions (expressions, predicates, combiners) report failures as an
//! [`OperatorError`], a boxed error that is wrapped into
//! [`ExecutionError::Operator`] together with the node name.

use thiserror::Error;

/// Error type returned by user-supplied operator functions.
pub type OperatorError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by user-supplied operator functions.
pub type OperatorResult<T> = Result<T, OperatorError>;

/// Errors detected while building or validating a workflow graph.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash)]
pub enum BuildError {
  /// A workflow or node name does not match `^[A-Za-z_][A-Za-z0-9_]*$`.
  #[error("Object name is invalid: {0}")]
  InvalidName(String),
  /// A node with this name is already registered.
  #[error("Node {0} already exists")]
  NodeAlreadyExists(String),
  /// No node with this name is registered.
  #[error("Node {0} not found")]
  NodeNotFound(String),
  /// A node has no path back to a source.
  #[error("Transformation {0} unconnected to a source")]
  UnconnectedToSource(String),
  /// A node has no path forward to a target.
  #[error("Transformation {0} unconnected to a target")]
  UnconnectedToTarget(String),
  /// The workflow holds no node at all.
  #[error("No transformation defined, workflow {0} is empty")]
  EmptyWorkflow(String),
  /// A target was assigned to a node without output ports.
  #[error("Cannot invoke 'add_target' on a NotUpStreamable object ({0})")]
  NotUpstreamable(String),
  /// A source was assigned to a node without input ports.
  #[error("Cannot invoke 'set_source' on a NotDownStreamable object ({0})")]
  NotDownstreamable(String),
  /// Several sources were given at once to a node with a single input port.
  #[error("Cannot invoke 'set_sources' on a mono downstreamable object ({0}), use 'set_source' instead")]
  SingleSource(String),
  /// The same source was attached twice to a multi-input node.
  #[error("Duplicated source: {parent} for {node}")]
  DuplicatedSource {
    /// The node receiving the duplicated source.
    node: String,
    /// The duplicated source.
    parent: String,
  },
  /// Two connectivity capabilities that cannot coexist were composed.
  #[error("Cannot compose capabilities {0:?} and {1:?}")]
  IncompatibleCapabilities(
    crate::capability::Capability,
    crate::capability::Capability,
  ),
  /// Connecting these nodes would close a cycle.
  #[error("Connecting {producer} to {consumer} would create a cycle")]
  CycleDetected {
    /// The producing node.
    producer: String,
    /// The consuming node.
    consumer: String,
  },
}

/// Non-fatal conditions recorded while building a workflow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
  /// A single-input node was reconnected; its previous source was detached.
  #[error("Parent node reset: {node} detached from {previous}")]
  ParentReset {
    /// The reconnected node.
    node: String,
    /// The source it was detached from.
    previous: String,
  },
  /// A node has more output ports connected than it can ever feed.
  #[error("{node} has {connected} targets but can feed at most {usable}")]
  TooManyTargets {
    /// The node with excess targets.
    node: String,
    /// Number of connected targets.
    connected: usize,
    /// Number of targets the node actually emits to.
    usable: usize,
  },
}

/// Errors raised when applying runtime configuration to a node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
  /// A required argument is absent, e.g. no adapter for a source or target.
  #[error("Argument '{argument}' is missing for configuring {node}")]
  MissingArgument {
    /// The node being configured.
    node: String,
    /// The missing argument.
    argument: String,
  },
  /// Adapter options could not be parsed into the adapter's option struct.
  #[error("Invalid options for {node}: {reason}")]
  InvalidOptions {
    /// The node being configured.
    node: String,
    /// Why the options were rejected.
    reason: String,
  },
  /// A configuration entry was supplied for a node that takes none.
  #[error("{0} does not accept any configuration")]
  NotConfigurable(String),
}

/// Errors raised by external I/O adapters.
#[derive(Error, Debug)]
pub enum AdapterError {
  /// Underlying I/O failed.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  /// CSV reading or writing failed.
  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),
  /// Options could not be parsed when the adapter was opened.
  #[error("invalid adapter options: {0}")]
  Options(String),
  /// The adapter was used after being closed.
  #[error("adapter {0} is closed")]
  Closed(String),
  /// The adapter's background worker went away.
  #[error("adapter worker failed: {0}")]
  Worker(String),
}

/// Errors raised while a workflow runs.
#[derive(Error, Debug)]
pub enum ExecutionError {
  /// A user function failed inside a node.
  #[error("Node '{node}' failed: {source}")]
  Operator {
    /// The failing node.
    node: String,
    /// The error returned by the user function.
    #[source]
    source: OperatorError,
  },
  /// An I/O adapter failed inside a source or target node.
  #[error("Adapter of node '{node}' failed: {source}")]
  Adapter {
    /// The failing node.
    node: String,
    /// The adapter failure.
    #[source]
    source: AdapterError,
  },
  /// An input channel closed before delivering its end-of-stream marker.
  #[error("Input {port} of node '{node}' closed before end of stream")]
  ChannelClosed {
    /// The receiving node.
    node: String,
    /// The input port index.
    port: usize,
  },
  /// A downstream channel was dropped while this node was still sending.
  #[error("Output {port} of node '{node}' has no receiver")]
  ReceiverDropped {
    /// The sending node.
    node: String,
    /// The output port index.
    port: usize,
  },
  /// A node tried to emit after its end-of-stream marker was sent.
  #[error("Node '{0}' emitted after end of stream")]
  EmitAfterEndOfStream(String),
  /// A single-input read was attempted on a node wired with several inputs.
  #[error("Node '{node}' has {inputs} inputs, expected exactly one")]
  AmbiguousInput {
    /// The node.
    node: String,
    /// Number of wired inputs.
    inputs: usize,
  },
  /// The executor could not find the channel for a graph edge.
  #[error("No port links {producer} to {consumer}")]
  MissingLink {
    /// The producing node.
    producer: String,
    /// The consuming node.
    consumer: String,
  },
  /// A source or target was scheduled without an adapter.
  #[error("Node '{0}' has no adapter configured")]
  NotConfigured(String),
  /// A node task panicked.
  #[error("Node '{0}' panicked")]
  Panicked(String),
  /// The run was cancelled from outside.
  #[error("Execution was cancelled")]
  Cancelled,
  /// Nothing was scheduled.
  #[error("No job to run for workflow {0}")]
  NoJobs(String),
  /// The async runtime could not be created.
  #[error("Runtime error: {0}")]
  Runtime(#[from] std::io::Error),
}

impl ExecutionError {
  /// Wraps a user function failure for `node`.
  pub fn operator(node: impl Into<String>, source: OperatorError) -> Self {
    Self::Operator {
      node: node.into(),
      source,
    }
  }

  /// Wraps an adapter failure for `node`.
  pub fn adapter(node: impl Into<String>, source: AdapterError) -> Self {
    Self::Adapter {
      node: node.into(),
      source,
    }
  }
}

/// Errors returned by [`Workflow::run`](crate::Workflow::run) and
/// [`Workflow::schedule`](crate::Workflow::schedule).
#[derive(Error, Debug)]
pub enum WorkflowError {
  /// The workflow failed validation.
  #[error("{name}: invalid workflow cannot be run ({reason})")]
  Invalid {
    /// Workflow name.
    name: String,
    /// Last validation error.
    reason: String,
  },
  /// The last `prepare` did not succeed for every node.
  #[error("{0}: workflow is not configured, call prepare() first")]
  NotConfigured(String),
  /// A build error surfaced directly.
  #[error(transparent)]
  Build(#[from] BuildError),
  /// The run itself failed.
  #[error(transparent)]
  Execution(#[from] ExecutionError),
}
