//! # I/O Adapters
//!
//! Sources and targets do not read or write anything themselves: they are
//! handed an adapter factory through the [`Configuration`](crate::Configuration)
//! and open it when the run starts.
//!
//! ## Contract
//!
//! - A [`SourceFactory`] opens a [`RowSource`]: a lazy, finite sequence of rows
//!   that cannot be restarted. Opening it again starts a new sequence.
//! - A [`TargetFactory`] opens a [`RowSink`] accepting rows one by one.
//! - Both handles release their resources when dropped, so a cancelled or
//!   failed run never leaks an open file. `close` is the orderly path that
//!   also reports flush errors.
//! - Options are a JSON object. Each adapter parses them into its own option
//!   struct and rejects unknown keys; this happens when the workflow is
//!   prepared, before any data flows.
//!
//! ## Provided adapters
//!
//! | Adapter            | Role   | Options                                     |
//! |--------------------|--------|---------------------------------------------|
//! | [`SequenceSource`] | source | none                                        |
//! | [`SequenceSink`]   | target | none                                        |
//! | [`StdOut`]         | target | none                                        |
//! | [`CsvSource`]      | source | `filename`, `delimiter`, `has_headers`      |
//! | [`CsvTarget`]      | target | `filename`, `delimiter`                     |

use crate::error::{AdapterError, ConfigurationError};
use crate::value::Row;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

mod csv_file;
mod sequence;
mod stdout;

#[cfg(test)]
mod csv_file_test;
#[cfg(test)]
mod sequence_test;

pub use csv_file::{CsvSource, CsvSourceOptions, CsvTarget, CsvTargetOptions};
pub use sequence::{SequenceSink, SequenceSource};
pub use stdout::StdOut;

/// Options handed to an adapter when it is opened.
pub type AdapterOptions = serde_json::Map<String, serde_json::Value>;

/// Parses adapter options into a typed option struct.
pub fn parse_options<T: DeserializeOwned>(
  node: &str,
  options: &AdapterOptions,
) -> Result<T, ConfigurationError> {
  serde_json::from_value(serde_json::Value::Object(options.clone())).map_err(|e| {
    ConfigurationError::InvalidOptions {
      node: node.to_string(),
      reason: e.to_string(),
    }
  })
}

/// Rejects any option, for adapters that take none.
pub fn expect_no_options(node: &str, options: &AdapterOptions) -> Result<(), ConfigurationError> {
  match options.keys().next() {
    None => Ok(()),
    Some(key) => Err(ConfigurationError::InvalidOptions {
      node: node.to_string(),
      reason: format!("unknown option `{}`", key),
    }),
  }
}

/// A sequence of rows opened by a source node.
#[async_trait]
pub trait RowSource: Send {
  /// Next row, `None` once the sequence is exhausted.
  async fn next_row(&mut self) -> Result<Option<Row>, AdapterError>;

  /// Releases the underlying resource.
  async fn close(&mut self) -> Result<(), AdapterError> {
    Ok(())
  }
}

/// A destination opened by a target node.
#[async_trait]
pub trait RowSink: Send {
  /// Writes one row.
  async fn send(&mut self, row: Row) -> Result<(), AdapterError>;

  /// Flushes and releases the underlying resource.
  async fn close(&mut self) -> Result<(), AdapterError> {
    Ok(())
  }
}

/// Opens [`RowSource`]s for source nodes.
#[async_trait]
pub trait SourceFactory: Send + Sync {
  /// Adapter name, for logs.
  fn name(&self) -> &'static str;

  /// Checks `options` before any run.
  fn check_options(&self, node: &str, options: &AdapterOptions) -> Result<(), ConfigurationError> {
    expect_no_options(node, options)
  }

  /// Opens a new sequence of rows.
  async fn open(&self, node: &str, options: &AdapterOptions)
  -> Result<Box<dyn RowSource>, AdapterError>;
}

/// Opens [`RowSink`]s for target nodes.
#[async_trait]
pub trait TargetFactory: Send + Sync {
  /// Adapter name, for logs.
  fn name(&self) -> &'static str;

  /// Checks `options` before any run.
  fn check_options(&self, node: &str, options: &AdapterOptions) -> Result<(), ConfigurationError> {
    expect_no_options(node, options)
  }

  /// Opens a new destination.
  async fn open(&self, node: &str, options: &AdapterOptions) -> Result<Box<dyn RowSink>, AdapterError>;
}
