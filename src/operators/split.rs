use super::user_error;
use crate::capability::Capabilities;
use crate::channels::NodeIo;
use crate::error::{BuildWarning, ExecutionError, OperatorResult};
use crate::processor::StreamProcessor;
use crate::transformation::Operator;
use crate::value::Row;
use async_trait::async_trait;
use std::sync::Arc;

type SplitFn = Arc<dyn Fn(&Row) -> OperatorResult<Vec<Row>> + Send + Sync>;

/// Maps every row to several rows, one per output.
///
/// The rows returned by the function are zipped onto the outputs in port
/// order, up to the arity: missing rows leave the matching outputs without a
/// value for that round, surplus rows are dropped.
pub struct Split {
  func: SplitFn,
  arity: usize,
}

impl Split {
  /// Splits rows with an infallible function, over two outputs.
  pub fn new(func: impl Fn(&Row) -> Vec<Row> + Send + Sync + 'static) -> Self {
    Self {
      func: Arc::new(move |row| Ok(func(row))),
      arity: 2,
    }
  }

  /// Splits rows with a fallible function, over two outputs.
  pub fn try_new(func: impl Fn(&Row) -> OperatorResult<Vec<Row>> + Send + Sync + 'static) -> Self {
    Self {
      func: Arc::new(func),
      arity: 2,
    }
  }

  /// Sets the number of outputs fed.
  #[must_use]
  pub fn with_arity(mut self, arity: usize) -> Self {
    self.arity = arity;
    self
  }
}

impl Operator for Split {
  fn kind(&self) -> &'static str {
    "Split"
  }

  fn capabilities(&self) -> Capabilities {
    Capabilities::ONE_TO_MANY
  }

  fn on_target_added(&self, node: &str, targets: usize) -> Option<BuildWarning> {
    (targets > self.arity).then(|| BuildWarning::TooManyTargets {
      node: node.to_string(),
      connected: targets,
      usable: self.arity,
    })
  }

  fn processor(&self, io: NodeIo) -> Result<Box<dyn StreamProcessor>, ExecutionError> {
    let ports = io.output_ports().into_iter().take(self.arity).collect();
    Ok(Box::new(SplitProcessor {
      io,
      func: self.func.clone(),
      ports,
    }))
  }
}

struct SplitProcessor {
  io: NodeIo,
  func: SplitFn,
  ports: Vec<usize>,
}

#[async_trait]
impl StreamProcessor for SplitProcessor {
  fn io(&self) -> &NodeIo {
    &self.io
  }

  fn io_mut(&mut self) -> &mut NodeIo {
    &mut self.io
  }

  async fn emit_row(&mut self, row: Row) -> Result<(), ExecutionError> {
    let rows = (self.func)(&row).map_err(user_error(self.io.name()))?;
    for (port, row) in self.ports.iter().zip(rows) {
      self.io.send_to(*port, row).await?;
    }
    Ok(())
  }
}
