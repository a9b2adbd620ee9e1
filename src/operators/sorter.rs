use crate::capability::Capabilities;
use crate::channels::NodeIo;
use crate::error::ExecutionError;
use crate::processor::{Emit, StreamProcessor};
use crate::transformation::Operator;
use crate::value::Row;
use async_trait::async_trait;
use std::cmp::Reverse;
use std::sync::Arc;

type SortFn = Arc<dyn Fn(&mut Vec<Row>, bool) + Send + Sync>;

/// Buffers its whole input, then emits it ordered by a key.
///
/// The sort is stable in both directions: rows with equal keys keep their
/// arrival order. Nothing is emitted before the input is exhausted.
pub struct Sorter {
  sort: SortFn,
  reverse: bool,
}

impl Default for Sorter {
  fn default() -> Self {
    Self::new(Row::clone)
  }
}

impl Sorter {
  /// Orders rows by `key`, ascending.
  pub fn new<K, F>(key: F) -> Self
  where
    K: Ord,
    F: Fn(&Row) -> K + Send + Sync + 'static,
  {
    Self {
      sort: Arc::new(move |rows: &mut Vec<Row>, reverse: bool| {
        if reverse {
          rows.sort_by_cached_key(|row| Reverse(key(row)));
        } else {
          rows.sort_by_cached_key(|row| key(row));
        }
      }),
      reverse: false,
    }
  }

  /// Sets descending order.
  #[must_use]
  pub fn with_reverse(mut self, reverse: bool) -> Self {
    self.reverse = reverse;
    self
  }
}

impl Operator for Sorter {
  fn kind(&self) -> &'static str {
    "Sorter"
  }

  fn capabilities(&self) -> Capabilities {
    Capabilities::ONE_TO_MANY
  }

  fn processor(&self, io: NodeIo) -> Result<Box<dyn StreamProcessor>, ExecutionError> {
    Ok(Box::new(SorterProcessor {
      io,
      sort: self.sort.clone(),
      reverse: self.reverse,
      buffer: Vec::new(),
    }))
  }
}

struct SorterProcessor {
  io: NodeIo,
  sort: SortFn,
  reverse: bool,
  buffer: Vec<Row>,
}

#[async_trait]
impl StreamProcessor for SorterProcessor {
  fn io(&self) -> &NodeIo {
    &self.io
  }

  fn io_mut(&mut self) -> &mut NodeIo {
    &mut self.io
  }

  fn process_row(&mut self, row: Row) -> Result<Emit, ExecutionError> {
    self.buffer.push(row);
    Ok(Emit::Nothing)
  }

  async fn flush(&mut self) -> Result<(), ExecutionError> {
    let mut rows = std::mem::take(&mut self.buffer);
    (self.sort)(&mut rows, self.reverse);
    for row in rows {
      self.emit_row(row).await?;
    }
    Ok(())
  }
}
