//! # CSV Adapter Test Suite
//!
//! Tests for the CSV source and target adapters.
//!
//! ## Test Coverage
//!
//! This test suite covers:
//!
//! - **Reading**: headers, delimiters and missing files
//! - **Writing**: quoting of written records
//! - **Options**: typed option checks

use super::{AdapterOptions, CsvSource, CsvTarget, SourceFactory, TargetFactory};
use crate::error::AdapterError;
use crate::row;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn options(value: serde_json::Value) -> AdapterOptions {
  match value {
    serde_json::Value::Object(map) => map,
    other => panic!("not an object: {other}"),
  }
}

#[tokio::test]
async fn test_csv_source_reads_string_fields() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("in.csv");
  fs::write(&path, "name,score\nHenry,12\nJane,7\n").unwrap();

  let opts = options(json!({ "filename": path, "has_headers": true }));
  let mut reader = CsvSource.open("src", &opts).await.unwrap();
  assert_eq!(reader.next_row().await.unwrap(), Some(row!["Henry", "12"]));
  assert_eq!(reader.next_row().await.unwrap(), Some(row!["Jane", "7"]));
  assert_eq!(reader.next_row().await.unwrap(), None);
  reader.close().await.unwrap();
}

#[tokio::test]
async fn test_csv_source_custom_delimiter_without_headers() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("in.csv");
  fs::write(&path, "a;b;c\nd;e\n").unwrap();

  let opts = options(json!({ "filename": path, "delimiter": ";" }));
  let mut reader = CsvSource.open("src", &opts).await.unwrap();
  assert_eq!(reader.next_row().await.unwrap(), Some(row!["a", "b", "c"]));
  assert_eq!(reader.next_row().await.unwrap(), Some(row!["d", "e"]));
  assert_eq!(reader.next_row().await.unwrap(), None);
}

#[tokio::test]
async fn test_csv_source_missing_file() {
  let dir = TempDir::new().unwrap();
  let opts = options(json!({ "filename": dir.path().join("missing.csv") }));
  let err = CsvSource.open("src", &opts).await.err().unwrap();
  assert!(matches!(err, AdapterError::Csv(_)));
}

#[tokio::test]
async fn test_csv_target_writes_records() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("out.csv");

  let opts = options(json!({ "filename": path }));
  let mut writer = CsvTarget.open("tgt", &opts).await.unwrap();
  writer.send(row![1, "Henry", 2.5]).await.unwrap();
  writer.send(row![2, "Jane, Doe"]).await.unwrap();
  writer.close().await.unwrap();

  assert_eq!(
    fs::read_to_string(&path).unwrap(),
    "1,Henry,2.5\n2,\"Jane, Doe\"\n"
  );
}

#[test]
fn test_csv_options_are_checked() {
  assert!(CsvSource.check_options("src", &options(json!({ "filename": "a.csv" }))).is_ok());
  assert!(CsvSource.check_options("src", &options(json!({}))).is_err());
  assert!(
    CsvSource
      .check_options("src", &options(json!({ "filename": "a.csv", "mode": "r" })))
      .is_err()
  );
  assert!(
    CsvTarget
      .check_options("tgt", &options(json!({ "filename": "a.csv", "delimiter": "é" })))
      .is_err()
  );
  assert!(
    CsvTarget
      .check_options("tgt", &options(json!({ "filename": "a.csv", "has_headers": true })))
      .is_err()
  );
}
