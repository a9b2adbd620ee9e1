//! # Filter Test Suite
//!
//! Tests for the [`Filter`](super::Filter) operator.
//!
//! ## Test Coverage
//!
//! This test suite covers:
//!
//! - **Predicates**: kept rows stay in order, numbers compare by value
//! - **Defaults**: a filter without predicate passes everything
//! - **Failures**: predicate errors abort the node

use super::Filter;
use super::test_support::run_operator;
use crate::{Value, row};

#[tokio::test]
async fn test_filter_keeps_matching_rows_in_order() {
  let op = Filter::new(|r| r[0] > Value::Int(0));
  let out = run_operator(&op, vec![vec![row![0], row![1], row![-1]]], 1)
    .await
    .unwrap();
  assert_eq!(out, vec![vec![row![1]]]);
}

#[tokio::test]
async fn test_filter_compares_mixed_numbers_by_value() {
  let op = Filter::new(|r| r[0] > Value::Int(0));
  let input = vec![row![0], row![1], row![-1.5], row![0.5]];
  let out = run_operator(&op, vec![input], 1).await.unwrap();
  assert_eq!(out, vec![vec![row![1], row![0.5]]]);
}

#[tokio::test]
async fn test_filter_default_passes_everything() {
  let op = Filter::default();
  let input = vec![row![3], row![1], row![2]];
  let out = run_operator(&op, vec![input.clone()], 1).await.unwrap();
  assert_eq!(out, vec![input]);
}

#[tokio::test]
async fn test_filter_subsequence_property() {
  let input: Vec<_> = (-20..20).map(|i| row![i]).collect();
  let op = Filter::new(|r| r[0].as_int().is_some_and(|i| i % 3 == 0));
  let out = run_operator(&op, vec![input.clone()], 2).await.unwrap();
  let expected: Vec<_> = input
    .into_iter()
    .filter(|r| r[0].as_int().is_some_and(|i| i % 3 == 0))
    .collect();
  assert_eq!(out, vec![expected.clone(), expected]);
}

#[tokio::test]
async fn test_filter_error_aborts() {
  let op = Filter::try_new(|r| r[0].as_bool().ok_or_else(|| "not a bool".into()));
  assert!(run_operator(&op, vec![vec![row![true], row![1]]], 1).await.is_err());
}
