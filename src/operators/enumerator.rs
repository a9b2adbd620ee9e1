use crate::capability::Capabilities;
use crate::channels::NodeIo;
use crate::error::ExecutionError;
use crate::processor::{Emit, StreamProcessor};
use crate::transformation::Operator;
use crate::value::{Row, Value};
use async_trait::async_trait;

/// Prefixes every row with a running index.
///
/// The index starts at `start` and goes back to `start` once it would exceed
/// `reset_after`. A `reset_after` of zero or less never wraps. Every run
/// starts counting afresh.
#[derive(Debug, Clone, Copy, Default)]
pub struct Enumerator {
  start: i64,
  reset_after: i64,
}

impl Enumerator {
  /// Counts from zero, never wrapping.
  pub fn new() -> Self {
    Self::default()
  }

  /// Sets the first index.
  #[must_use]
  pub fn with_start(mut self, start: i64) -> Self {
    self.start = start;
    self
  }

  /// Sets the largest index before wrapping back to the start.
  #[must_use]
  pub fn with_reset_after(mut self, reset_after: i64) -> Self {
    self.reset_after = reset_after;
    self
  }
}

impl Operator for Enumerator {
  fn kind(&self) -> &'static str {
    "Enumerator"
  }

  fn capabilities(&self) -> Capabilities {
    Capabilities::ONE_TO_MANY
  }

  fn processor(&self, io: NodeIo) -> Result<Box<dyn StreamProcessor>, ExecutionError> {
    Ok(Box::new(EnumeratorProcessor {
      io,
      settings: *self,
      index: self.start,
    }))
  }
}

struct EnumeratorProcessor {
  io: NodeIo,
  settings: Enumerator,
  index: i64,
}

#[async_trait]
impl StreamProcessor for EnumeratorProcessor {
  fn io(&self) -> &NodeIo {
    &self.io
  }

  fn io_mut(&mut self) -> &mut NodeIo {
    &mut self.io
  }

  fn process_row(&mut self, row: Row) -> Result<Emit, ExecutionError> {
    let out = row.prepend(Value::Int(self.index));
    self.index += 1;
    if self.settings.reset_after > 0 && self.index > self.settings.reset_after {
      self.index = self.settings.start;
    }
    Ok(Emit::Row(out))
  }
}
