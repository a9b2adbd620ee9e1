//! In-memory adapters: rows from a vector, rows into a shared container.

use super::{AdapterOptions, RowSink, RowSource, SourceFactory, TargetFactory};
use crate::error::AdapterError;
use crate::value::Row;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Source adapter yielding a fixed list of rows.
///
/// Every run opens a fresh iteration over the same rows.
#[derive(Debug, Clone, Default)]
pub struct SequenceSource {
  rows: Arc<[Row]>,
}

impl SequenceSource {
  /// Creates a source over `rows`.
  pub fn new(rows: impl IntoIterator<Item = Row>) -> Self {
    Self {
      rows: rows.into_iter().collect(),
    }
  }
}

struct SequenceReader {
  rows: Arc<[Row]>,
  position: usize,
}

#[async_trait]
impl RowSource for SequenceReader {
  async fn next_row(&mut self) -> Result<Option<Row>, AdapterError> {
    let row = self.rows.get(self.position).cloned();
    self.position += 1;
    Ok(row)
  }
}

#[async_trait]
impl SourceFactory for SequenceSource {
  fn name(&self) -> &'static str {
    "sequence"
  }

  async fn open(
    &self,
    _node: &str,
    _options: &AdapterOptions,
  ) -> Result<Box<dyn RowSource>, AdapterError> {
    Ok(Box::new(SequenceReader {
      rows: self.rows.clone(),
      position: 0,
    }))
  }
}

/// Target adapter appending every row to a shared container.
///
/// Clones share the same container, so a test can keep one handle and give
/// another to the configuration.
#[derive(Debug, Clone, Default)]
pub struct SequenceSink {
  container: Arc<Mutex<Vec<Row>>>,
}

impl SequenceSink {
  /// Creates an empty container.
  pub fn new() -> Self {
    Self::default()
  }

  /// Snapshot of the rows received so far.
  pub fn rows(&self) -> Vec<Row> {
    self
      .container
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .clone()
  }

  /// Empties the container.
  pub fn clear(&self) {
    self
      .container
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .clear();
  }
}

struct SequenceWriter {
  container: Arc<Mutex<Vec<Row>>>,
}

#[async_trait]
impl RowSink for SequenceWriter {
  async fn send(&mut self, row: Row) -> Result<(), AdapterError> {
    self
      .container
      .lock()
      .map_err(|_| AdapterError::Worker("sequence container poisoned".to_string()))?
      .push(row);
    Ok(())
  }
}

#[async_trait]
impl TargetFactory for SequenceSink {
  fn name(&self) -> &'static str {
    "sequence"
  }

  async fn open(
    &self,
    _node: &str,
    _options: &AdapterOptions,
  ) -> Result<Box<dyn RowSink>, AdapterError> {
    Ok(Box::new(SequenceWriter {
      container: self.container.clone(),
    }))
  }
}
