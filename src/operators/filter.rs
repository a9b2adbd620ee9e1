use super::{Predicate, predicate, user_error};
use crate::capability::Capabilities;
use crate::channels::NodeIo;
use crate::error::{ExecutionError, OperatorResult};
use crate::processor::StreamProcessor;
use crate::transformation::Operator;
use crate::value::Row;
use async_trait::async_trait;
use std::sync::Arc;

/// Drops the rows that do not satisfy a predicate.
///
/// Without a predicate every row passes.
#[derive(Default)]
pub struct Filter {
  predicate: Option<Predicate>,
}

impl Filter {
  /// Keeps rows for which `f` returns `true`.
  pub fn new(f: impl Fn(&Row) -> bool + Send + Sync + 'static) -> Self {
    Self {
      predicate: Some(predicate(f)),
    }
  }

  /// Keeps rows for which `f` returns `Ok(true)`. An error aborts the run.
  pub fn try_new(f: impl Fn(&Row) -> OperatorResult<bool> + Send + Sync + 'static) -> Self {
    Self {
      predicate: Some(Arc::new(f)),
    }
  }
}

impl Operator for Filter {
  fn kind(&self) -> &'static str {
    "Filter"
  }

  fn capabilities(&self) -> Capabilities {
    Capabilities::ONE_TO_MANY
  }

  fn processor(&self, io: NodeIo) -> Result<Box<dyn StreamProcessor>, ExecutionError> {
    Ok(Box::new(FilterProcessor {
      io,
      predicate: self.predicate.clone(),
    }))
  }
}

struct FilterProcessor {
  io: NodeIo,
  predicate: Option<Predicate>,
}

#[async_trait]
impl StreamProcessor for FilterProcessor {
  fn io(&self) -> &NodeIo {
    &self.io
  }

  fn io_mut(&mut self) -> &mut NodeIo {
    &mut self.io
  }

  fn can_emit_row(&self, row: &Row) -> Result<bool, ExecutionError> {
    match &self.predicate {
      Some(predicate) => predicate(row).map_err(user_error(self.io.name())),
      None => Ok(true),
    }
  }
}
