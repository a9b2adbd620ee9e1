use super::{RowFn, user_error};
use crate::capability::Capabilities;
use crate::channels::NodeIo;
use crate::error::{ExecutionError, OperatorResult};
use crate::processor::{Emit, StreamProcessor};
use crate::transformation::Operator;
use crate::value::Row;
use async_trait::async_trait;
use std::sync::Arc;

/// Applies a function to every row.
pub struct Expression {
  func: RowFn,
}

impl Expression {
  /// Creates an expression from an infallible function.
  pub fn new(func: impl Fn(&Row) -> Row + Send + Sync + 'static) -> Self {
    Self {
      func: Arc::new(move |row| Ok(func(row))),
    }
  }

  /// Creates an expression from a fallible function. An error aborts the run.
  pub fn try_new(func: impl Fn(&Row) -> OperatorResult<Row> + Send + Sync + 'static) -> Self {
    Self {
      func: Arc::new(func),
    }
  }
}

impl Operator for Expression {
  fn kind(&self) -> &'static str {
    "Expression"
  }

  fn capabilities(&self) -> Capabilities {
    Capabilities::ONE_TO_MANY
  }

  fn processor(&self, io: NodeIo) -> Result<Box<dyn StreamProcessor>, ExecutionError> {
    Ok(Box::new(ExpressionProcessor {
      io,
      func: self.func.clone(),
    }))
  }
}

struct ExpressionProcessor {
  io: NodeIo,
  func: RowFn,
}

#[async_trait]
impl StreamProcessor for ExpressionProcessor {
  fn io(&self) -> &NodeIo {
    &self.io
  }

  fn io_mut(&mut self) -> &mut NodeIo {
    &mut self.io
  }

  fn process_row(&mut self, row: Row) -> Result<Emit, ExecutionError> {
    (self.func)(&row)
      .map(Emit::Row)
      .map_err(user_error(self.io.name()))
  }
}
