//! # Workflow
//!
//! The façade users build, validate, configure and run.
//!
//! ## Lifecycle
//!
//! 1. **Build.** [`Workflow::start_build`] (fresh graph) or
//!    [`Workflow::resume_build`] (existing graph) hands out a
//!    [`WorkflowBuilder`]. Nodes and edges can only be added through it, and it
//!    borrows the workflow mutably, so nothing else touches the graph while it
//!    is alive. Closing or dropping the builder marks the workflow as requiring
//!    validation.
//! 2. **Validate.** [`Workflow::validate`] checks reachability; an empty graph
//!    is invalid. [`Workflow::is_valid`] validates lazily.
//! 3. **Prepare.** [`Workflow::prepare`] applies a [`Configuration`] to every
//!    node and records the nodes that reject it.
//! 4. **Run.** [`Workflow::run`] / [`Workflow::schedule`] refuse to start
//!    unless the workflow is both valid and configured, then wire one channel
//!    per edge, create one job per node and delegate to the [`Executor`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use gibbon::{
//!   ConfigEntry, Configuration, Filter, SequenceSink, SequenceSource, TokioExecutor, Value,
//!   Workflow, row,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut workflow = Workflow::new("positives")?;
//! {
//!   let mut build = workflow.start_build();
//!   build.add_source("src")?;
//!   build.add_transformation("keep", Filter::new(|r| r[0] > Value::Int(0)), "src", &[])?;
//!   build.add_target("tgt", Some("keep"))?;
//! }
//!
//! let sink = SequenceSink::new();
//! let mut config = Configuration::new();
//! config.add_configuration(
//!   "src",
//!   ConfigEntry::new().with_source(SequenceSource::new([row![0], row![1], row![-1]])),
//! );
//! config.add_configuration("tgt", ConfigEntry::new().with_target(sink.clone()));
//!
//! workflow.prepare(&config)?;
//! workflow.run(&mut TokioExecutor::new())?;
//! assert_eq!(sink.rows(), vec![row![1]]);
//! # Ok(())
//! # }
//! ```

use crate::configuration::Configuration;
use crate::error::{BuildError, BuildWarning, ConfigurationError, WorkflowError};
use crate::execution::{Executor, RunReport};
use crate::graph::{Graph, NodeId};
use crate::operators::{Source, Target};
use crate::transformation::Operator;
use regex::Regex;
use std::convert::Infallible;
use std::sync::LazyLock;
use tracing::{debug, error, info};

static VALID_NAME: LazyLock<Option<Regex>> =
  LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());

/// Whether `name` is usable as a workflow or node name.
pub fn is_valid_name(name: &str) -> bool {
  VALID_NAME.as_ref().is_some_and(|re| re.is_match(name))
}

fn check_name(name: &str) -> Result<(), BuildError> {
  if is_valid_name(name) {
    Ok(())
  } else {
    Err(BuildError::InvalidName(name.to_string()))
  }
}

/// Upstream nodes of a transformation being added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Sources {
  /// Not connected yet.
  #[default]
  None,
  /// A single source.
  One(String),
  /// Several sources, attached in this order.
  Many(Vec<String>),
}

impl Sources {
  fn names(&self) -> Vec<&str> {
    match self {
      Sources::None => Vec::new(),
      Sources::One(name) => vec![name.as_str()],
      Sources::Many(names) => names.iter().map(String::as_str).collect(),
    }
  }
}

impl From<&str> for Sources {
  fn from(name: &str) -> Self {
    Sources::One(name.to_string())
  }
}

impl From<String> for Sources {
  fn from(name: String) -> Self {
    Sources::One(name)
  }
}

impl From<Option<&str>> for Sources {
  fn from(name: Option<&str>) -> Self {
    name.map_or(Sources::None, Into::into)
  }
}

impl From<&[&str]> for Sources {
  fn from(names: &[&str]) -> Self {
    Sources::Many(names.iter().map(|n| n.to_string()).collect())
  }
}

impl<const N: usize> From<[&str; N]> for Sources {
  fn from(names: [&str; N]) -> Self {
    Sources::from(&names[..])
  }
}

impl From<Vec<String>> for Sources {
  fn from(names: Vec<String>) -> Self {
    Sources::Many(names)
  }
}

/// A named pipeline: a graph plus its build and configuration state.
#[derive(Debug)]
pub struct Workflow {
  name: String,
  graph: Graph,
  build_errors: Vec<BuildError>,
  validation_errors: Vec<BuildError>,
  warnings: Vec<BuildWarning>,
  config_errors: Vec<ConfigurationError>,
  valid: bool,
  requires_validation: bool,
  configured: bool,
}

impl Workflow {
  /// Creates an empty workflow.
  pub fn new(name: &str) -> Result<Self, BuildError> {
    check_name(name)?;
    Ok(Self {
      name: name.to_string(),
      graph: Graph::new(),
      build_errors: Vec::new(),
      validation_errors: Vec::new(),
      warnings: Vec::new(),
      config_errors: Vec::new(),
      valid: false,
      requires_validation: true,
      configured: false,
    })
  }

  /// Workflow name.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// The underlying graph.
  pub fn graph(&self) -> &Graph {
    &self.graph
  }

  /// Starts building on a fresh graph. Previous nodes, errors and warnings
  /// are discarded.
  pub fn start_build(&mut self) -> WorkflowBuilder<'_> {
    self.graph = Graph::new();
    self.build_errors.clear();
    self.validation_errors.clear();
    self.warnings.clear();
    self.config_errors.clear();
    debug!(workflow = %self.name, "build started");
    WorkflowBuilder { workflow: self }
  }

  /// Resumes building on the current graph.
  pub fn resume_build(&mut self) -> WorkflowBuilder<'_> {
    debug!(workflow = %self.name, "build resumed");
    WorkflowBuilder { workflow: self }
  }

  fn may_require_validation(&mut self) {
    self.requires_validation = true;
    self.configured = false;
  }

  /// Recomputes validity. A workflow is valid when it is not empty, every
  /// node is reachable from a source and reaches a target, and no build
  /// error was recorded since [`Workflow::start_build`].
  ///
  /// Returns the last error found, if any; all of them stay available through
  /// [`Workflow::get_all_errors`]. With `verbose`, every error is logged.
  pub fn validate(&mut self, verbose: bool) -> Result<(), BuildError> {
    if !self.requires_validation {
      info!(workflow = %self.name, "workflow does not seem to require validation");
    }
    info!(workflow = %self.name, "validating workflow");

    let mut errors = Vec::new();
    if self.graph.is_empty() {
      errors.push(BuildError::EmptyWorkflow(self.name.clone()));
    } else {
      self.graph.check_reachability(|e| errors.push(e));
    }
    self.validation_errors = errors;
    self.valid = self.validation_errors.is_empty() && self.build_errors.is_empty();
    self.requires_validation = !self.valid;

    if verbose {
      for e in self.build_errors.iter().chain(&self.validation_errors) {
        error!(workflow = %self.name, "{}", e);
      }
    }

    match self.last_error() {
      None => {
        info!(workflow = %self.name, "workflow is valid");
        Ok(())
      }
      Some(last) => {
        info!(
          workflow = %self.name,
          errors = self.build_errors.len() + self.validation_errors.len(),
          "workflow is invalid"
        );
        Err(last.clone())
      }
    }
  }

  /// Validity, validating first when the graph changed since the
  /// last validation.
  pub fn is_valid(&mut self) -> bool {
    if self.requires_validation {
      let _ = self.validate(false);
    }
    self.valid
  }

  /// Whether the last [`Workflow::prepare`] succeeded for every node.
  pub fn is_configured(&self) -> bool {
    self.configured
  }

  /// Errors rejected during construction, in order.
  pub fn build_errors(&self) -> &[BuildError] {
    &self.build_errors
  }

  /// Errors found by the last validation.
  pub fn validation_errors(&self) -> &[BuildError] {
    &self.validation_errors
  }

  /// Warnings recorded during construction.
  pub fn warnings(&self) -> &[BuildWarning] {
    &self.warnings
  }

  /// Configuration errors recorded by the last [`Workflow::prepare`].
  pub fn configuration_errors(&self) -> &[ConfigurationError] {
    &self.config_errors
  }

  /// Most recent build or validation error.
  pub fn last_error(&self) -> Option<&BuildError> {
    self
      .validation_errors
      .last()
      .or_else(|| self.build_errors.last())
  }

  /// One `error: ...` line per recorded error, or `No error.`.
  pub fn get_all_errors(&self) -> String {
    let lines: String = self
      .build_errors
      .iter()
      .chain(&self.validation_errors)
      .map(|e| format!("error: {}\n", e))
      .chain(self.config_errors.iter().map(|e| format!("error: {}\n", e)))
      .collect();
    if lines.is_empty() {
      "No error.".to_string()
    } else {
      lines
    }
  }

  /// One `warning: ...` line per recorded warning, or `No warning.`.
  pub fn get_all_warnings(&self) -> String {
    let lines: String = self
      .warnings
      .iter()
      .map(|w| format!("warning: {}\n", w))
      .collect();
    if lines.is_empty() {
      "No warning.".to_string()
    } else {
      lines
    }
  }

  /// Applies `config` to every node.
  ///
  /// Every node is visited even after a failure, so all configuration errors
  /// are recorded at once.
  pub fn prepare(&mut self, config: &Configuration) -> Result<(), WorkflowError> {
    self.ensure_valid()?;
    let mut errors = Vec::new();
    let _ = self.graph.bfs_traverse(|node| {
      if let Err(e) = config.set_configuration(node) {
        error!(workflow = %self.name, node = %node.name(), error = %e, "configuration rejected");
        errors.push(e);
      }
      Ok::<(), Infallible>(())
    });
    self.configured = errors.is_empty();
    self.config_errors = errors;

    if self.configured {
      info!(workflow = %self.name, "workflow prepared");
      Ok(())
    } else {
      Err(WorkflowError::NotConfigured(self.name.clone()))
    }
  }

  /// Resets every node and discards its configuration entry.
  pub fn reset(&mut self, config: &mut Configuration) {
    let _ = self.graph.bfs_traverse(|node| {
      config.reset_configuration(node);
      Ok::<(), Infallible>(())
    });
    self.configured = false;
    self.config_errors.clear();
    debug!(workflow = %self.name, "workflow reset");
  }

  fn ensure_valid(&mut self) -> Result<(), WorkflowError> {
    if self.is_valid() {
      return Ok(());
    }
    let reason = self.last_error().map_or_else(String::new, ToString::to_string);
    error!(workflow = %self.name, %reason, "invalid workflow");
    Err(WorkflowError::Invalid {
      name: self.name.clone(),
      reason,
    })
  }

  fn ensure_runnable(&mut self) -> Result<(), WorkflowError> {
    self.ensure_valid()?;
    if !self.configured {
      error!(workflow = %self.name, "workflow is not configured");
      return Err(WorkflowError::NotConfigured(self.name.clone()));
    }
    Ok(())
  }

  /// Wires one channel per edge and hands one job per node to `executor`.
  fn submit(&mut self, executor: &mut dyn Executor) -> Result<(), WorkflowError> {
    self.clear_io();
    let submitted = self
      .graph
      .bfs_traverse_links(|producer, consumer| executor.set_queues(producer, consumer))
      .and_then(|()| self.graph.bfs_traverse(|node| executor.create_job_from(node)));
    if let Err(e) = submitted {
      self.clear_io();
      return Err(e.into());
    }
    Ok(())
  }

  fn clear_io(&mut self) {
    for node in self.graph.nodes_mut() {
      node.clear_io();
    }
  }

  /// Runs the workflow to completion, blocking the current thread.
  ///
  /// Fails with [`ExecutionError::Runtime`](crate::ExecutionError::Runtime)
  /// when called from within an async runtime; use [`Workflow::schedule`]
  /// there.
  pub fn run(&mut self, executor: &mut dyn Executor) -> Result<RunReport, WorkflowError> {
    self.ensure_runnable()?;
    self.submit(executor)?;
    info!(workflow = %self.name, "running workflow");
    let report = executor.run(&self.name);
    self.clear_io();
    Ok(report?)
  }

  /// Runs the workflow to completion on the current async runtime.
  pub async fn schedule(&mut self, executor: &mut dyn Executor) -> Result<RunReport, WorkflowError> {
    self.ensure_runnable()?;
    self.submit(executor)?;
    info!(workflow = %self.name, "scheduling workflow");
    let report = executor.schedule(&self.name).await;
    self.clear_io();
    Ok(report?)
  }
}

/// Build scope of a [`Workflow`].
///
/// Every method validates names first and returns the error it hits; errors
/// are also recorded on the workflow, and warnings are recorded only.
#[derive(Debug)]
pub struct WorkflowBuilder<'a> {
  workflow: &'a mut Workflow,
}

impl WorkflowBuilder<'_> {
  fn record<T>(&mut self, result: Result<T, BuildError>) -> Result<T, BuildError> {
    if let Err(e) = &result {
      error!(workflow = %self.workflow.name, "{}", e);
      self.workflow.build_errors.push(e.clone());
    }
    result
  }

  fn ids_of(&self, names: &[&str]) -> Result<Vec<NodeId>, BuildError> {
    names
      .iter()
      .map(|name| self.workflow.graph.id_of(name))
      .collect()
  }

  fn insert(
    &mut self,
    name: &str,
    operator: Box<dyn Operator>,
    sources: &[&str],
    targets: &[&str],
  ) -> Result<(), BuildError> {
    check_name(name)?;
    let parents = self.ids_of(sources)?;
    let children = self.ids_of(targets)?;
    let (_, warnings) = self
      .workflow
      .graph
      .insert_between(name, operator, &parents, &children)?;
    self.workflow.warnings.extend(warnings);
    self.workflow.may_require_validation();
    Ok(())
  }

  /// Adds a source node.
  pub fn add_source(&mut self, name: &str) -> Result<(), BuildError> {
    let result = self.insert(name, Box::new(Source::new()), &[], &[]);
    self.record(result)
  }

  /// Adds a target node, optionally fed by `source`.
  pub fn add_target(&mut self, name: &str, source: Option<&str>) -> Result<(), BuildError> {
    let sources: Vec<&str> = source.into_iter().collect();
    let result = self.insert(name, Box::new(Target::new()), &sources, &[]);
    self.record(result)
  }

  /// Adds a transformation fed by `sources` and feeding `targets`.
  pub fn add_transformation(
    &mut self,
    name: &str,
    operator: impl Operator + 'static,
    sources: impl Into<Sources>,
    targets: &[&str],
  ) -> Result<(), BuildError> {
    let sources = sources.into();
    let result = self.insert(name, Box::new(operator), &sources.names(), targets);
    self.record(result)
  }

  /// Makes `source` a source of each of `targets`, in order.
  pub fn connect(&mut self, source: &str, targets: &[&str]) -> Result<(), BuildError> {
    let result = self.connect_all(source, targets);
    self.record(result)
  }

  fn connect_all(&mut self, source: &str, targets: &[&str]) -> Result<(), BuildError> {
    let producer = self.workflow.graph.id_of(source)?;
    for consumer in self.ids_of(targets)? {
      self.workflow.may_require_validation();
      let warnings = self.workflow.graph.connect(producer, consumer)?;
      self.workflow.warnings.extend(warnings);
    }
    Ok(())
  }

  /// Read access to the graph under construction.
  pub fn graph(&self) -> &Graph {
    &self.workflow.graph
  }

  /// Ends the build scope.
  pub fn close(self) {}
}

impl Drop for WorkflowBuilder<'_> {
  fn drop(&mut self) {
    self.workflow.may_require_validation();
    debug!(workflow = %self.workflow.name, nodes = self.workflow.graph.len(), "build closed");
  }
}
