//! # Enumerator Test Suite
//!
//! Tests for the [`Enumerator`](super::Enumerator) operator.
//!
//! ## Test Coverage
//!
//! This test suite covers:
//!
//! - **Counting**: start value and wrap-around ceiling
//! - **Runs**: the index restarts on every run

use super::Enumerator;
use super::test_support::run_operator;
use crate::row;

fn names() -> Vec<crate::Row> {
  vec![row!["Henry"], row!["Jane"], row!["Willy"]]
}

#[tokio::test]
async fn test_enumerator_counts_from_start() {
  let op = Enumerator::new();
  let out = run_operator(&op, vec![names()], 1).await.unwrap();
  assert_eq!(
    out,
    vec![vec![row![0, "Henry"], row![1, "Jane"], row![2, "Willy"]]]
  );
}

#[tokio::test]
async fn test_enumerator_wraps_after_ceiling() {
  let op = Enumerator::new().with_start(1).with_reset_after(1);
  let out = run_operator(&op, vec![names()], 1).await.unwrap();
  assert_eq!(
    out,
    vec![vec![row![1, "Henry"], row![1, "Jane"], row![1, "Willy"]]]
  );

  let op = Enumerator::new().with_start(0).with_reset_after(1);
  let out = run_operator(&op, vec![names()], 1).await.unwrap();
  assert_eq!(
    out,
    vec![vec![row![0, "Henry"], row![1, "Jane"], row![0, "Willy"]]]
  );
}

#[tokio::test]
async fn test_enumerator_restarts_every_run() {
  let op = Enumerator::new().with_start(5);
  for _ in 0..2 {
    let out = run_operator(&op, vec![names()], 1).await.unwrap();
    assert_eq!(out[0][0], row![5, "Henry"]);
  }
}
