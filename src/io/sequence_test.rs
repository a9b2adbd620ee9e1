//! # Sequence Adapter Test Suite
//!
//! Tests for the in-memory adapters.
//!
//! ## Test Coverage
//!
//! This test suite covers:
//!
//! - **Source**: every open starts a new sequence
//! - **Sink**: clones share one container
//! - **Options**: options are refused

use super::{AdapterOptions, SequenceSink, SequenceSource, SourceFactory, TargetFactory};
use crate::row;

#[tokio::test]
async fn test_sequence_source_restarts_on_every_open() {
  let source = SequenceSource::new(vec![row![1], row![2]]);
  let options = AdapterOptions::new();
  for _ in 0..2 {
    let mut reader = source.open("src", &options).await.unwrap();
    assert_eq!(reader.next_row().await.unwrap(), Some(row![1]));
    assert_eq!(reader.next_row().await.unwrap(), Some(row![2]));
    assert_eq!(reader.next_row().await.unwrap(), None);
    reader.close().await.unwrap();
  }
}

#[tokio::test]
async fn test_sequence_sink_clones_share_container() {
  let sink = SequenceSink::new();
  let handle = sink.clone();
  let mut writer = sink.open("tgt", &AdapterOptions::new()).await.unwrap();
  writer.send(row!["a"]).await.unwrap();
  writer.send(row!["b"]).await.unwrap();
  writer.close().await.unwrap();
  assert_eq!(handle.rows(), vec![row!["a"], row!["b"]]);

  handle.clear();
  assert!(sink.rows().is_empty());
}

#[test]
fn test_sequence_rejects_options() {
  let mut options = AdapterOptions::new();
  options.insert("filename".to_string(), serde_json::json!("x.csv"));
  assert!(SequenceSource::default().check_options("src", &options).is_err());
  assert!(SequenceSink::new().check_options("tgt", &options).is_err());
  assert!(SequenceSink::new().check_options("tgt", &AdapterOptions::new()).is_ok());
}
