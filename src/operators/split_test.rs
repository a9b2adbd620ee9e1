//! # Split Test Suite
//!
//! Tests for the [`Split`](super::Split) operator.
//!
//! ## Test Coverage
//!
//! This test suite covers:
//!
//! - **Dispatch**: function rows zipped onto outputs
//! - **Arity**: surplus rows dropped, warning beyond arity

use super::Split;
use super::test_support::run_operator;
use crate::error::BuildWarning;
use crate::transformation::Operator;
use crate::{Row, row};

fn halves(r: &Row) -> Vec<Row> {
  let mid = r.len() / 2;
  vec![Row::from(&r[..mid]), Row::from(&r[mid..])]
}

#[tokio::test]
async fn test_split_zips_rows_onto_outputs() {
  let out = run_operator(&Split::new(halves), vec![vec![row![1, 2, 3, 4], row!["a", "b"]]], 2)
    .await
    .unwrap();
  assert_eq!(out[0], vec![row![1, 2], row!["a"]]);
  assert_eq!(out[1], vec![row![3, 4], row!["b"]]);
}

#[tokio::test]
async fn test_split_fewer_rows_than_outputs() {
  let op = Split::new(|r| if r[0] == crate::Value::Int(0) { vec![] } else { vec![r.clone()] })
    .with_arity(3);
  let out = run_operator(&op, vec![vec![row![0], row![1]]], 3).await.unwrap();
  assert_eq!(out, vec![vec![row![1]], vec![], vec![]]);
}

#[tokio::test]
async fn test_split_drops_surplus_rows() {
  let op = Split::new(|r| vec![r.clone(), r.clone(), r.clone()]);
  let out = run_operator(&op, vec![vec![row![7]]], 2).await.unwrap();
  assert_eq!(out, vec![vec![row![7]], vec![row![7]]]);
}

#[test]
fn test_split_warns_beyond_arity() {
  let op = Split::new(halves);
  assert!(op.on_target_added("split", 2).is_none());
  assert!(matches!(
    op.on_target_added("split", 3),
    Some(BuildWarning::TooManyTargets { usable: 2, .. })
  ));
}
