use crate::capability::Capabilities;
use crate::channels::NodeIo;
use crate::error::ExecutionError;
use crate::processor::{Emit, StreamProcessor};
use crate::transformation::Operator;
use crate::value::{Row, Value};
use async_trait::async_trait;
use std::sync::Arc;

/// Turns the trailing fields of a row into one row each.
///
/// With `key = 2` and entries `Maths, CS, Physics`, the row
/// `('Norman', 'MSc.', 50, 70, 25)` becomes
///
/// ```text
/// ('Norman', 'MSc.', 'Maths', 50)
/// ('Norman', 'MSc.', 'CS', 70)
/// ('Norman', 'MSc.', 'Physics', 25)
/// ```
///
/// Entries and trailing fields are paired until either runs out.
pub struct Normalizer {
  key: usize,
  entries: Arc<[Value]>,
}

impl Normalizer {
  /// Keeps the first `key` fields of every row and pairs the remaining ones
  /// with `entries`.
  pub fn new<V: Into<Value>>(key: usize, entries: impl IntoIterator<Item = V>) -> Self {
    Self {
      key,
      entries: entries.into_iter().map(Into::into).collect(),
    }
  }
}

impl Operator for Normalizer {
  fn kind(&self) -> &'static str {
    "Normalizer"
  }

  fn capabilities(&self) -> Capabilities {
    Capabilities::ONE_TO_MANY
  }

  fn processor(&self, io: NodeIo) -> Result<Box<dyn StreamProcessor>, ExecutionError> {
    Ok(Box::new(NormalizerProcessor {
      io,
      key: self.key,
      entries: self.entries.clone(),
    }))
  }
}

struct NormalizerProcessor {
  io: NodeIo,
  key: usize,
  entries: Arc<[Value]>,
}

#[async_trait]
impl StreamProcessor for NormalizerProcessor {
  fn io(&self) -> &NodeIo {
    &self.io
  }

  fn io_mut(&mut self) -> &mut NodeIo {
    &mut self.io
  }

  fn process_row(&mut self, row: Row) -> Result<Emit, ExecutionError> {
    let split = self.key.min(row.len());
    let (head, tail) = row.split_at(split);
    let rows = self
      .entries
      .iter()
      .zip(tail)
      .map(|(entry, value)| {
        head
          .iter()
          .cloned()
          .chain([entry.clone(), value.clone()])
          .collect::<Row>()
      })
      .collect();
    Ok(Emit::Rows(rows))
  }
}
