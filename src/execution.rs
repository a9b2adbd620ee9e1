//! # Execution
//!
//! An [`Executor`] turns a validated, configured graph into concurrently
//! running jobs. The [`Workflow`](crate::Workflow) drives it in three steps:
//!
//! 1. [`Executor::set_queues`] once per edge, breadth first: one channel per
//!    edge, registered as an output of the producer and an input of the
//!    consumer. A node fanning out gets one channel per target.
//! 2. [`Executor::create_job_from`] once per node: the node's processor,
//!    owning its channel endpoints, becomes a job.
//! 3. [`Executor::schedule`] (async) or [`Executor::run`] (blocking) starts
//!    every job and waits for all of them.
//!
//! ## Failure handling
//!
//! The first job that fails or panics aborts every job still running. Aborted
//! jobs drop their channel endpoints and adapter handles, which closes files
//! and releases resources. The first failure is returned; later ones are only
//! logged. A [`CancellationToken`] aborts a run from outside in the same way.
//!
//! ## Execution models
//!
//! [`Executor::run`] builds a runtime per [`ExecutionModel`]: a single-threaded
//! event loop where every job is a cooperative task, or a thread pool. The
//! suspension points are the same in both: channel receives, channel sends
//! when bounded, and adapter I/O, which runs on the blocking pool.

use crate::channels::{ChannelCapacity, channel};
use crate::error::ExecutionError;
use crate::processor::StreamProcessor;
use crate::transformation::Transformation;
use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

/// Wiring and scheduling contract between a workflow and a concurrency
/// backend.
#[async_trait]
pub trait Executor: Send {
  /// Creates the channel of the edge `producer -> consumer`.
  fn set_queues(
    &mut self,
    producer: &mut Transformation,
    consumer: &mut Transformation,
  ) -> Result<(), ExecutionError>;

  /// Turns `node` into a job for the next run.
  fn create_job_from(&mut self, node: &mut Transformation) -> Result<(), ExecutionError>;

  /// Runs every job created so far on the current runtime.
  async fn schedule(&mut self, name: &str) -> Result<RunReport, ExecutionError>;

  /// Runs every job created so far, blocking the current thread. Fails
  /// when called from within an async runtime.
  fn run(&mut self, name: &str) -> Result<RunReport, ExecutionError>;
}

/// Concurrency backend of [`TokioExecutor::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionModel {
  /// One thread, every job a cooperative task.
  #[default]
  CurrentThread,
  /// A pool of worker threads.
  MultiThread {
    /// Number of worker threads.
    workers: usize,
  },
}

/// Settings of a [`TokioExecutor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
  /// Runtime built by [`Executor::run`].
  pub model: ExecutionModel,
  /// Capacity of every edge channel.
  pub channel_capacity: ChannelCapacity,
}

impl ExecutorConfig {
  /// Sets the execution model.
  #[must_use]
  pub fn with_model(mut self, model: ExecutionModel) -> Self {
    self.model = model;
    self
  }

  /// Sets the capacity of edge channels.
  #[must_use]
  pub fn with_channel_capacity(mut self, capacity: ChannelCapacity) -> Self {
    self.channel_capacity = capacity;
    self
  }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
  /// Name of the workflow run.
  pub workflow: String,
  /// Every job, as node name and operator kind, in scheduling order.
  pub jobs: Vec<(String, &'static str)>,
  /// Wall-clock duration of the run.
  pub elapsed: Duration,
}

struct Job {
  name: String,
  kind: &'static str,
  processor: Box<dyn StreamProcessor>,
}

/// Executor running every node as a tokio task.
pub struct TokioExecutor {
  config: ExecutorConfig,
  jobs: Vec<Job>,
  cancel: CancellationToken,
}

impl std::fmt::Debug for TokioExecutor {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TokioExecutor")
      .field("config", &self.config)
      .field("jobs", &self.jobs.iter().map(|j| &j.name).collect::<Vec<_>>())
      .finish()
  }
}

impl Default for TokioExecutor {
  fn default() -> Self {
    Self::with_config(ExecutorConfig::default())
  }
}

impl TokioExecutor {
  /// Creates an executor with the default configuration.
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates an executor with `config`.
  pub fn with_config(config: ExecutorConfig) -> Self {
    Self {
      config,
      jobs: Vec::new(),
      cancel: CancellationToken::new(),
    }
  }

  /// Current configuration.
  pub fn config(&self) -> &ExecutorConfig {
    &self.config
  }

  /// Token aborting the current and every later run of this executor once
  /// cancelled.
  pub fn cancellation_token(&self) -> CancellationToken {
    self.cancel.clone()
  }

  /// Number of jobs waiting for the next run.
  pub fn pending_jobs(&self) -> usize {
    self.jobs.len()
  }

  fn build_runtime(&self) -> Result<tokio::runtime::Runtime, ExecutionError> {
    let runtime = match self.config.model {
      ExecutionModel::CurrentThread => tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?,
      ExecutionModel::MultiThread { workers } => tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers.max(1))
        .enable_all()
        .build()?,
    };
    Ok(runtime)
  }
}

/// Records `failure` as the run's outcome unless one is already recorded,
/// aborting every other job in that case.
fn fail_fast(
  first: &mut Option<ExecutionError>,
  failure: ExecutionError,
  tasks: &mut JoinSet<(String, Result<(), ExecutionError>)>,
) {
  if first.is_none() {
    tasks.abort_all();
    *first = Some(failure);
  } else {
    debug!(error = %failure, "failure after abort ignored");
  }
}

#[async_trait]
impl Executor for TokioExecutor {
  fn set_queues(
    &mut self,
    producer: &mut Transformation,
    consumer: &mut Transformation,
  ) -> Result<(), ExecutionError> {
    let missing = || ExecutionError::MissingLink {
      producer: producer.name().to_string(),
      consumer: consumer.name().to_string(),
    };
    let output = producer.output_port_of(consumer.id()).ok_or_else(missing)?;
    let input = consumer.input_port_of(producer.id()).ok_or_else(missing)?;

    let (tx, rx) = channel(self.config.channel_capacity);
    producer.io_mut().add_output(output, tx);
    consumer.io_mut().add_input(input, rx);
    trace!(
      producer = %producer.name(),
      output,
      consumer = %consumer.name(),
      input,
      "channel created"
    );
    Ok(())
  }

  fn create_job_from(&mut self, node: &mut Transformation) -> Result<(), ExecutionError> {
    let processor = node.processor()?;
    debug!(node = %node.name(), kind = node.kind(), "job created");
    self.jobs.push(Job {
      name: node.name().to_string(),
      kind: node.kind(),
      processor,
    });
    Ok(())
  }

  async fn schedule(&mut self, name: &str) -> Result<RunReport, ExecutionError> {
    let jobs = std::mem::take(&mut self.jobs);
    if jobs.is_empty() {
      return Err(ExecutionError::NoJobs(name.to_string()));
    }
    if self.cancel.is_cancelled() {
      return Err(ExecutionError::Cancelled);
    }

    info!(workflow = %name, jobs = jobs.len(), "starting jobs");
    let started = Instant::now();
    let mut report = RunReport {
      workflow: name.to_string(),
      jobs: Vec::with_capacity(jobs.len()),
      elapsed: Duration::ZERO,
    };

    let mut tasks = JoinSet::new();
    for job in jobs {
      debug!(workflow = %name, node = %job.name, kind = job.kind, "starting job");
      report.jobs.push((job.name.clone(), job.kind));
      let Job {
        name: node,
        mut processor,
        ..
      } = job;
      tasks.spawn(async move {
        let outcome = AssertUnwindSafe(processor.process_rows())
          .catch_unwind()
          .await
          .unwrap_or_else(|_| Err(ExecutionError::Panicked(node.clone())));
        (node, outcome)
      });
    }

    let mut first: Option<ExecutionError> = None;
    loop {
      tokio::select! {
        _ = self.cancel.cancelled(), if first.is_none() => {
          info!(workflow = %name, "run cancelled");
          fail_fast(&mut first, ExecutionError::Cancelled, &mut tasks);
        }
        joined = tasks.join_next() => match joined {
          None => break,
          Some(Ok((node, Ok(())))) => {
            debug!(workflow = %name, node = %node, "job completed");
          }
          Some(Ok((node, Err(e)))) => {
            error!(workflow = %name, node = %node, error = %e, "job failed");
            fail_fast(&mut first, e, &mut tasks);
          }
          Some(Err(e)) if e.is_cancelled() => {
            trace!(workflow = %name, "job aborted");
          }
          Some(Err(e)) => {
            error!(workflow = %name, error = %e, "job could not be joined");
            fail_fast(&mut first, ExecutionError::Panicked(e.to_string()), &mut tasks);
          }
        }
      }
    }

    report.elapsed = started.elapsed();
    match first {
      Some(e) => {
        error!(workflow = %name, error = %e, "run failed");
        Err(e)
      }
      None => {
        info!(workflow = %name, elapsed = ?report.elapsed, "run completed");
        Ok(report)
      }
    }
  }

  fn run(&mut self, name: &str) -> Result<RunReport, ExecutionError> {
    if tokio::runtime::Handle::try_current().is_ok() {
      self.jobs.clear();
      error!(workflow = %name, "blocking run requested from within a runtime");
      return Err(ExecutionError::Runtime(std::io::Error::other(
        "cannot block on a run from within an async runtime, schedule it instead",
      )));
    }
    let runtime = match self.build_runtime() {
      Ok(runtime) => runtime,
      Err(e) => {
        self.jobs.clear();
        return Err(e);
      }
    };
    debug!(workflow = %name, model = ?self.config.model, "runtime built");
    runtime.block_on(self.schedule(name))
  }
}
