use super::{Predicate, predicate, user_error};
use crate::capability::Capabilities;
use crate::channels::NodeIo;
use crate::error::{BuildWarning, ExecutionError, OperatorResult};
use crate::processor::StreamProcessor;
use crate::transformation::Operator;
use crate::value::Row;
use async_trait::async_trait;
use std::sync::Arc;

/// Routes rows to the outputs of the conditions they satisfy.
///
/// Condition `i` feeds output port `i`. Every condition is evaluated: a row
/// matching several conditions is copied to each of their outputs. A row
/// matching none goes to output `K` (the default branch) when that port is
/// connected, and is dropped otherwise.
///
/// Connecting more than `K + 1` targets records a warning; the extra
/// targets only ever receive the end-of-stream marker.
#[derive(Default)]
pub struct Selector {
  conditions: Vec<Predicate>,
}

impl Selector {
  /// Creates a selector without conditions.
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends a condition.
  #[must_use]
  pub fn when(mut self, condition: impl Fn(&Row) -> bool + Send + Sync + 'static) -> Self {
    self.conditions.push(predicate(condition));
    self
  }

  /// Appends a fallible condition. An error aborts the run.
  #[must_use]
  pub fn try_when(
    mut self,
    condition: impl Fn(&Row) -> OperatorResult<bool> + Send + Sync + 'static,
  ) -> Self {
    self.conditions.push(Arc::new(condition));
    self
  }

  /// Number of conditions.
  pub fn len(&self) -> usize {
    self.conditions.len()
  }

  /// Whether no condition was added.
  pub fn is_empty(&self) -> bool {
    self.conditions.is_empty()
  }
}

impl Operator for Selector {
  fn kind(&self) -> &'static str {
    "Selector"
  }

  fn capabilities(&self) -> Capabilities {
    Capabilities::ONE_TO_MANY
  }

  fn on_target_added(&self, node: &str, targets: usize) -> Option<BuildWarning> {
    let usable = self.conditions.len() + 1;
    (targets > usable).then(|| BuildWarning::TooManyTargets {
      node: node.to_string(),
      connected: targets,
      usable,
    })
  }

  fn processor(&self, io: NodeIo) -> Result<Box<dyn StreamProcessor>, ExecutionError> {
    Ok(Box::new(SelectorProcessor {
      io,
      conditions: self.conditions.clone(),
    }))
  }
}

struct SelectorProcessor {
  io: NodeIo,
  conditions: Vec<Predicate>,
}

#[async_trait]
impl StreamProcessor for SelectorProcessor {
  fn io(&self) -> &NodeIo {
    &self.io
  }

  fn io_mut(&mut self) -> &mut NodeIo {
    &mut self.io
  }

  async fn emit_row(&mut self, row: Row) -> Result<(), ExecutionError> {
    let mut matched = Vec::new();
    for (port, condition) in self.conditions.iter().enumerate() {
      if condition(&row).map_err(user_error(self.io.name()))? {
        matched.push(port);
      }
    }

    if matched.is_empty() {
      return self.io.send_to(self.conditions.len(), row).await;
    }
    for port in matched {
      self.io.send_to(port, row.clone()).await?;
    }
    Ok(())
  }
}
