//! # Gibbon
//!
//! Graph-based streaming ETL in pure Rust.
//!
//! A [`Workflow`] is a directed acyclic graph of tuple operators connecting
//! one or more sources to one or more targets. Once built and validated, it
//! is configured with concrete I/O adapters and run by an [`Executor`]: every
//! node becomes a tokio task, every edge a channel carrying rows followed by
//! one end-of-stream marker, and the first failing task cancels the run.
//!
//! ## Key Features
//!
//! - **Capability rules**: each operator declares how many inputs and outputs
//!   it accepts; illegal connections are rejected while building.
//! - **Reachability validation**: every node must reach a source backward and
//!   a target forward before the workflow can run.
//! - **Streaming operators**: expressions, filters, sorters, aggregators,
//!   selectors, unions, concatenations, splits, normalizers and enumerators.
//! - **Pluggable adapters**: in-memory sequences, stdout and CSV files.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gibbon::{
//!   Aggregator, ConfigEntry, Configuration, SequenceSink, SequenceSource, TokioExecutor,
//!   Workflow, row, simple_sum,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut workflow = Workflow::new("totals")?;
//! {
//!   let mut build = workflow.start_build();
//!   build.add_source("scores")?;
//!   build.add_transformation(
//!     "sum",
//!     Aggregator::new(|r| row![r[0].clone()], simple_sum(1)),
//!     "scores",
//!     &[],
//!   )?;
//!   build.add_target("out", Some("sum"))?;
//! }
//!
//! let sink = SequenceSink::new();
//! let mut config = Configuration::new();
//! config.add_configuration(
//!   "scores",
//!   ConfigEntry::new().with_source(SequenceSource::new([row!["a", 1], row!["a", 3]])),
//! );
//! config.add_configuration("out", ConfigEntry::new().with_target(sink.clone()));
//!
//! workflow.prepare(&config)?;
//! workflow.run(&mut TokioExecutor::new())?;
//! assert_eq!(sink.rows(), vec![row!["a", 4]]);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

/// Connectivity contracts of operators.
pub mod capability;
/// Edge channels and per-node channel endpoints.
pub mod channels;
/// Per-node runtime configuration.
pub mod configuration;
/// Error taxonomy.
pub mod error;
/// Executors scheduling one task per node.
pub mod execution;
/// The workflow graph.
pub mod graph;
/// External I/O adapters.
pub mod io;
/// Built-in operators.
pub mod operators;
/// The stream processing protocol.
pub mod processor;
/// Graph nodes and the operator trait.
pub mod transformation;
/// Atomic values and rows.
pub mod value;
/// Workflow builder and validator.
pub mod workflow;

#[cfg(test)]
mod graph_test;
#[cfg(test)]
mod workflow_test;

pub use capability::{Capabilities, Capability};
pub use channels::{CHANNEL_BUFFER_SIZE, ChannelCapacity, ChannelMessage, NodeIo};
pub use configuration::{ConfigEntry, Configuration};
pub use error::{
  AdapterError, BuildError, BuildWarning, ConfigurationError, ExecutionError, OperatorError,
  OperatorResult, WorkflowError,
};
pub use execution::{ExecutionModel, Executor, ExecutorConfig, RunReport, TokioExecutor};
pub use graph::{Graph, NodeId};
pub use io::{CsvSource, CsvTarget, SequenceSink, SequenceSource, StdOut};
pub use operators::{
  Aggregator, Concat, Enumerator, Expression, Filter, Normalizer, Selector, Sorter, Source,
  Split, Target, Union, row_count, simple_sum,
};
pub use processor::{Emit, StreamProcessor};
pub use transformation::{Operator, Transformation};
pub use value::{Row, Value, ValueError};
pub use workflow::{Sources, Workflow, WorkflowBuilder, is_valid_name};
