//! CSV file adapters.
//!
//! The `csv` crate is synchronous, so the file is opened, read and written on
//! tokio's blocking pool. Rows travel between the blocking thread and the
//! node task over a bounded channel; dropping the node-side handle closes the
//! channel, which stops the thread and closes the file.

use super::{AdapterOptions, RowSink, RowSource, SourceFactory, TargetFactory, parse_options};
use crate::channels::CHANNEL_BUFFER_SIZE;
use crate::error::{AdapterError, ConfigurationError};
use crate::value::{Row, Value};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

fn default_delimiter() -> char {
  ','
}

fn delimiter_byte(delimiter: char) -> Result<u8, String> {
  u8::try_from(delimiter)
    .ok()
    .filter(u8::is_ascii)
    .ok_or_else(|| format!("delimiter {:?} is not a single ASCII character", delimiter))
}

/// Options of [`CsvSource`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsvSourceOptions {
  /// File to read.
  pub filename: PathBuf,
  /// Field delimiter, `,` by default.
  #[serde(default = "default_delimiter")]
  pub delimiter: char,
  /// Whether the first line is a header to skip.
  #[serde(default)]
  pub has_headers: bool,
}

/// Options of [`CsvTarget`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsvTargetOptions {
  /// File to create or truncate.
  pub filename: PathBuf,
  /// Field delimiter, `,` by default.
  #[serde(default = "default_delimiter")]
  pub delimiter: char,
}

fn check<T: DeserializeOwned>(
  node: &str,
  options: &AdapterOptions,
  delimiter: impl Fn(&T) -> char,
) -> Result<T, ConfigurationError> {
  let parsed: T = parse_options(node, options)?;
  delimiter_byte(delimiter(&parsed)).map_err(|reason| ConfigurationError::InvalidOptions {
    node: node.to_string(),
    reason,
  })?;
  Ok(parsed)
}

/// Source adapter reading a CSV file. Every field is read as a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSource;

struct CsvReader {
  rows: mpsc::Receiver<Result<Row, AdapterError>>,
}

#[async_trait]
impl RowSource for CsvReader {
  async fn next_row(&mut self) -> Result<Option<Row>, AdapterError> {
    self.rows.recv().await.transpose()
  }

  async fn close(&mut self) -> Result<(), AdapterError> {
    self.rows.close();
    Ok(())
  }
}

#[async_trait]
impl SourceFactory for CsvSource {
  fn name(&self) -> &'static str {
    "csv"
  }

  fn check_options(&self, node: &str, options: &AdapterOptions) -> Result<(), ConfigurationError> {
    check(node, options, |o: &CsvSourceOptions| o.delimiter).map(|_| ())
  }

  async fn open(
    &self,
    node: &str,
    options: &AdapterOptions,
  ) -> Result<Box<dyn RowSource>, AdapterError> {
    let options = check(node, options, |o: &CsvSourceOptions| o.delimiter)
      .map_err(|e| AdapterError::Options(e.to_string()))?;
    let delimiter = delimiter_byte(options.delimiter).map_err(AdapterError::Options)?;
    let path = options.filename.clone();

    let reader = tokio::task::spawn_blocking(move || {
      ::csv::ReaderBuilder::new()
        .has_headers(options.has_headers)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(&path)
    })
    .await
    .map_err(|e| AdapterError::Worker(e.to_string()))??;
    debug!(node = %node, file = %options.filename.display(), "opened csv source");

    let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    let node = node.to_string();
    tokio::task::spawn_blocking(move || {
      for record in reader.into_records() {
        match record {
          Ok(record) => {
            let row: Row = record.iter().map(Value::from).collect();
            if tx.blocking_send(Ok(row)).is_err() {
              break;
            }
          }
          Err(e) => {
            error!(node = %node, error = %e, "failed to read csv record");
            let _ = tx.blocking_send(Err(e.into()));
            break;
          }
        }
      }
    });

    Ok(Box::new(CsvReader { rows: rx }))
  }
}

/// Target adapter writing rows to a CSV file, one record per row.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvTarget;

struct CsvWriter {
  rows: Option<mpsc::Sender<Row>>,
  worker: Option<JoinHandle<Result<(), AdapterError>>>,
}

impl CsvWriter {
  async fn finish(&mut self) -> Result<(), AdapterError> {
    self.rows.take();
    match self.worker.take() {
      Some(worker) => worker
        .await
        .map_err(|e| AdapterError::Worker(e.to_string()))?,
      None => Ok(()),
    }
  }
}

#[async_trait]
impl RowSink for CsvWriter {
  async fn send(&mut self, row: Row) -> Result<(), AdapterError> {
    let Some(rows) = &self.rows else {
      return Err(AdapterError::Closed("csv".to_string()));
    };
    if rows.send(row).await.is_err() {
      // The writer thread stopped early: surface its error.
      self.finish().await?;
      return Err(AdapterError::Closed("csv".to_string()));
    }
    Ok(())
  }

  async fn close(&mut self) -> Result<(), AdapterError> {
    self.finish().await
  }
}

#[async_trait]
impl TargetFactory for CsvTarget {
  fn name(&self) -> &'static str {
    "csv"
  }

  fn check_options(&self, node: &str, options: &AdapterOptions) -> Result<(), ConfigurationError> {
    check(node, options, |o: &CsvTargetOptions| o.delimiter).map(|_| ())
  }

  async fn open(
    &self,
    node: &str,
    options: &AdapterOptions,
  ) -> Result<Box<dyn RowSink>, AdapterError> {
    let options = check(node, options, |o: &CsvTargetOptions| o.delimiter)
      .map_err(|e| AdapterError::Options(e.to_string()))?;
    let delimiter = delimiter_byte(options.delimiter).map_err(AdapterError::Options)?;
    let path = options.filename.clone();

    let mut writer = tokio::task::spawn_blocking(move || {
      ::csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(&path)
    })
    .await
    .map_err(|e| AdapterError::Worker(e.to_string()))??;
    debug!(node = %node, file = %options.filename.display(), "opened csv target");

    let (tx, mut rx) = mpsc::channel::<Row>(CHANNEL_BUFFER_SIZE);
    let worker = tokio::task::spawn_blocking(move || -> Result<(), AdapterError> {
      while let Some(row) = rx.blocking_recv() {
        writer.write_record(row.iter().map(Value::to_field))?;
      }
      writer.flush()?;
      Ok(())
    });

    Ok(Box::new(CsvWriter {
      rows: Some(tx),
      worker: Some(worker),
    }))
  }
}
