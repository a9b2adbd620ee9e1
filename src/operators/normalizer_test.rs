//! # Normalizer Test Suite
//!
//! Tests for the [`Normalizer`](super::Normalizer) operator.
//!
//! ## Test Coverage
//!
//! This test suite covers:
//!
//! - **Expansion**: one row per trailing field
//! - **Edge Cases**: short rows and keys wider than the row

use super::Normalizer;
use super::test_support::run_operator;
use crate::row;

#[tokio::test]
async fn test_normalizer_expands_trailing_fields() {
  let op = Normalizer::new(2, ["Maths", "CS", "Physics"]);
  let out = run_operator(&op, vec![vec![row!["Norman", "MSc.", 50, 70, 25]]], 1)
    .await
    .unwrap();
  assert_eq!(
    out,
    vec![vec![
      row!["Norman", "MSc.", "Maths", 50],
      row!["Norman", "MSc.", "CS", 70],
      row!["Norman", "MSc.", "Physics", 25],
    ]]
  );
}

#[tokio::test]
async fn test_normalizer_stops_at_shorter_side() {
  let op = Normalizer::new(1, ["q1", "q2", "q3"]);
  let out = run_operator(&op, vec![vec![row!["id", 1, 2], row!["other", 9, 8, 7, 6]]], 1)
    .await
    .unwrap();
  assert_eq!(
    out,
    vec![vec![
      row!["id", "q1", 1],
      row!["id", "q2", 2],
      row!["other", "q1", 9],
      row!["other", "q2", 8],
      row!["other", "q3", 7],
    ]]
  );
}

#[tokio::test]
async fn test_normalizer_key_wider_than_row() {
  let op = Normalizer::new(5, ["a"]);
  let out = run_operator(&op, vec![vec![row![1, 2]]], 1).await.unwrap();
  assert!(out[0].is_empty());
}
