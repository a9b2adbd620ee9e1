//! Source and target nodes.
//!
//! Neither holds data itself: both are configured with an adapter factory
//! and open it when their task starts.

use crate::capability::Capabilities;
use crate::channels::NodeIo;
use crate::configuration::ConfigEntry;
use crate::error::{ConfigurationError, ExecutionError};
use crate::io::{AdapterOptions, SourceFactory, TargetFactory};
use crate::processor::StreamProcessor;
use crate::transformation::Operator;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

fn merged(current: &AdapterOptions, entry: Option<&ConfigEntry>) -> AdapterOptions {
  let mut options = current.clone();
  if let Some(entry) = entry {
    options.extend(entry.options().clone());
  }
  options
}

/// Entry point of a workflow, fed by a source adapter.
#[derive(Default)]
pub struct Source {
  adapter: Option<Arc<dyn SourceFactory>>,
  options: AdapterOptions,
}

impl Source {
  /// Creates an unconfigured source.
  pub fn new() -> Self {
    Self::default()
  }

  /// Whether an adapter was configured.
  pub fn is_configured(&self) -> bool {
    self.adapter.is_some()
  }
}

impl Operator for Source {
  fn kind(&self) -> &'static str {
    "Source"
  }

  fn capabilities(&self) -> Capabilities {
    Capabilities::SOURCE
  }

  /// An entry naming a source adapter replaces the adapter and its options.
  /// Without one, options are merged into those of the adapter already held.
  fn configure(&mut self, node: &str, entry: Option<&ConfigEntry>) -> Result<(), ConfigurationError> {
    if entry.is_some_and(|e| e.target().is_some()) {
      return Err(ConfigurationError::InvalidOptions {
        node: node.to_string(),
        reason: "a target adapter cannot feed a source".to_string(),
      });
    }

    match (entry.and_then(ConfigEntry::source), &self.adapter) {
      (Some(adapter), _) => {
        let options = merged(&AdapterOptions::new(), entry);
        adapter.check_options(node, &options)?;
        self.adapter = Some(adapter.clone());
        self.options = options;
      }
      (None, Some(adapter)) => {
        let options = merged(&self.options, entry);
        adapter.check_options(node, &options)?;
        self.options = options;
      }
      (None, None) => {
        return Err(ConfigurationError::MissingArgument {
          node: node.to_string(),
          argument: "source".to_string(),
        });
      }
    }
    Ok(())
  }

  fn reset(&mut self) {
    self.adapter = None;
    self.options.clear();
  }

  fn processor(&self, io: NodeIo) -> Result<Box<dyn StreamProcessor>, ExecutionError> {
    let adapter = self
      .adapter
      .clone()
      .ok_or_else(|| ExecutionError::NotConfigured(io.name().to_string()))?;
    Ok(Box::new(SourceProcessor {
      io,
      adapter,
      options: self.options.clone(),
    }))
  }
}

struct SourceProcessor {
  io: NodeIo,
  adapter: Arc<dyn SourceFactory>,
  options: AdapterOptions,
}

#[async_trait]
impl StreamProcessor for SourceProcessor {
  fn io(&self) -> &NodeIo {
    &self.io
  }

  fn io_mut(&mut self) -> &mut NodeIo {
    &mut self.io
  }

  async fn process_rows(&mut self) -> Result<(), ExecutionError> {
    let node = self.io.name().to_string();
    let mut source = self
      .adapter
      .open(&node, &self.options)
      .await
      .map_err(|e| ExecutionError::adapter(&node, e))?;
    debug!(node = %node, adapter = self.adapter.name(), "source opened");

    let mut count = 0usize;
    while let Some(row) = source
      .next_row()
      .await
      .map_err(|e| ExecutionError::adapter(&node, e))?
    {
      self.emit_row(row).await?;
      count += 1;
    }
    source
      .close()
      .await
      .map_err(|e| ExecutionError::adapter(&node, e))?;
    debug!(node = %node, rows = count, "source exhausted");
    self.emit_eof().await
  }
}

/// Exit point of a workflow, draining into a target adapter.
#[derive(Default)]
pub struct Target {
  adapter: Option<Arc<dyn TargetFactory>>,
  options: AdapterOptions,
}

impl Target {
  /// Creates an unconfigured target.
  pub fn new() -> Self {
    Self::default()
  }

  /// Whether an adapter was configured.
  pub fn is_configured(&self) -> bool {
    self.adapter.is_some()
  }
}

impl Operator for Target {
  fn kind(&self) -> &'static str {
    "Target"
  }

  fn capabilities(&self) -> Capabilities {
    Capabilities::TARGET
  }

  fn configure(&mut self, node: &str, entry: Option<&ConfigEntry>) -> Result<(), ConfigurationError> {
    if entry.is_some_and(|e| e.source().is_some()) {
      return Err(ConfigurationError::InvalidOptions {
        node: node.to_string(),
        reason: "a source adapter cannot drain a target".to_string(),
      });
    }

    match (entry.and_then(ConfigEntry::target), &self.adapter) {
      (Some(adapter), _) => {
        let options = merged(&AdapterOptions::new(), entry);
        adapter.check_options(node, &options)?;
        self.adapter = Some(adapter.clone());
        self.options = options;
      }
      (None, Some(adapter)) => {
        let options = merged(&self.options, entry);
        adapter.check_options(node, &options)?;
        self.options = options;
      }
      (None, None) => {
        return Err(ConfigurationError::MissingArgument {
          node: node.to_string(),
          argument: "target".to_string(),
        });
      }
    }
    Ok(())
  }

  fn reset(&mut self) {
    self.adapter = None;
    self.options.clear();
  }

  fn processor(&self, io: NodeIo) -> Result<Box<dyn StreamProcessor>, ExecutionError> {
    let adapter = self
      .adapter
      .clone()
      .ok_or_else(|| ExecutionError::NotConfigured(io.name().to_string()))?;
    Ok(Box::new(TargetProcessor {
      io,
      adapter,
      options: self.options.clone(),
    }))
  }
}

struct TargetProcessor {
  io: NodeIo,
  adapter: Arc<dyn TargetFactory>,
  options: AdapterOptions,
}

#[async_trait]
impl StreamProcessor for TargetProcessor {
  fn io(&self) -> &NodeIo {
    &self.io
  }

  fn io_mut(&mut self) -> &mut NodeIo {
    &mut self.io
  }

  async fn process_rows(&mut self) -> Result<(), ExecutionError> {
    let node = self.io.name().to_string();
    let mut sink = self
      .adapter
      .open(&node, &self.options)
      .await
      .map_err(|e| ExecutionError::adapter(&node, e))?;
    debug!(node = %node, adapter = self.adapter.name(), "target opened");

    loop {
      let message = self.get_row().await?;
      if self.may_stop_process(&message) {
        break;
      }
      if let Some(row) = message.into_row() {
        sink
          .send(row)
          .await
          .map_err(|e| ExecutionError::adapter(&node, e))?;
      }
    }
    sink
      .close()
      .await
      .map_err(|e| ExecutionError::adapter(&node, e))?;
    self.emit_eof().await
  }
}
