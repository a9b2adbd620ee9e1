use super::{CombineFn, user_error};
use crate::capability::Capabilities;
use crate::channels::NodeIo;
use crate::error::{ExecutionError, OperatorResult};
use crate::processor::{Emit, StreamProcessor};
use crate::row;
use crate::transformation::Operator;
use crate::value::{Row, Value};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

type KeyFn = Arc<dyn Fn(&Row) -> Row + Send + Sync>;

/// Groups rows by key and folds every group into an accumulator.
///
/// Once the input is exhausted one row per group is emitted: the key fields
/// followed by the first field of the final accumulator. Groups are emitted
/// in order of first appearance.
pub struct Aggregator {
  key: KeyFn,
  func: CombineFn,
  initializer: Row,
}

impl Aggregator {
  /// Groups by `key` and folds each group with `func(row, accumulator)`,
  /// starting from `(0,)`.
  pub fn new(
    key: impl Fn(&Row) -> Row + Send + Sync + 'static,
    func: impl Fn(&Row, &Row) -> OperatorResult<Row> + Send + Sync + 'static,
  ) -> Self {
    Self {
      key: Arc::new(key),
      func: Arc::new(func),
      initializer: row![0],
    }
  }

  /// Sets the accumulator every group starts from.
  #[must_use]
  pub fn with_initializer(mut self, initializer: Row) -> Self {
    self.initializer = initializer;
    self
  }
}

/// Combiner counting the rows of a group.
pub fn row_count() -> impl Fn(&Row, &Row) -> OperatorResult<Row> + Send + Sync + Clone + 'static {
  |_row: &Row, acc: &Row| -> OperatorResult<Row> {
    Ok(row![acc.field(0)?.try_add(&Value::Int(1))?])
  }
}

/// Combiner summing field `index` of the rows of a group.
pub fn simple_sum(
  index: usize,
) -> impl Fn(&Row, &Row) -> OperatorResult<Row> + Send + Sync + Clone + 'static {
  move |row: &Row, acc: &Row| -> OperatorResult<Row> {
    Ok(row![acc.field(0)?.try_add(row.field(index)?)?])
  }
}

impl Operator for Aggregator {
  fn kind(&self) -> &'static str {
    "Aggregator"
  }

  fn capabilities(&self) -> Capabilities {
    Capabilities::ONE_TO_MANY
  }

  fn processor(&self, io: NodeIo) -> Result<Box<dyn StreamProcessor>, ExecutionError> {
    Ok(Box::new(AggregatorProcessor {
      io,
      key: self.key.clone(),
      func: self.func.clone(),
      initializer: self.initializer.clone(),
      index: HashMap::new(),
      groups: Vec::new(),
    }))
  }
}

struct AggregatorProcessor {
  io: NodeIo,
  key: KeyFn,
  func: CombineFn,
  initializer: Row,
  index: HashMap<Row, usize>,
  groups: Vec<(Row, Row)>,
}

#[async_trait]
impl StreamProcessor for AggregatorProcessor {
  fn io(&self) -> &NodeIo {
    &self.io
  }

  fn io_mut(&mut self) -> &mut NodeIo {
    &mut self.io
  }

  fn process_row(&mut self, row: Row) -> Result<Emit, ExecutionError> {
    let key = (self.key)(&row);
    let slot = match self.index.get(&key) {
      Some(slot) => *slot,
      None => {
        self.groups.push((key.clone(), self.initializer.clone()));
        self.index.insert(key, self.groups.len() - 1);
        self.groups.len() - 1
      }
    };
    let acc = (self.func)(&row, &self.groups[slot].1).map_err(user_error(self.io.name()))?;
    self.groups[slot].1 = acc;
    Ok(Emit::Nothing)
  }

  async fn flush(&mut self) -> Result<(), ExecutionError> {
    self.index.clear();
    let groups = std::mem::take(&mut self.groups);
    for (key, acc) in groups {
      let first = acc
        .field(0)
        .map_err(|e| ExecutionError::operator(self.io.name(), Box::new(e)))?
        .clone();
      let row: Row = key.iter().cloned().chain(std::iter::once(first)).collect();
      self.emit_row(row).await?;
    }
    Ok(())
  }
}
