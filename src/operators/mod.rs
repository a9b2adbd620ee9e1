//! # Operators
//!
//! The operator set. Each operator pairs a build-time description (an
//! [`Operator`](crate::Operator) implementation holding the user functions)
//! with a run-time [`StreamProcessor`](crate::StreamProcessor) created fresh
//! for every run, so per-run state such as an enumerator's index or a
//! sorter's buffer never leaks from one run to the next.
//!
//! | Operator       | Inputs | Outputs | Behaviour                                   |
//! |----------------|--------|---------|---------------------------------------------|
//! | [`Source`]     | 0      | N       | rows from the configured adapter            |
//! | [`Target`]     | 1      | 0       | rows into the configured adapter            |
//! | [`Expression`] | 1      | N       | row to row function                         |
//! | [`Filter`]     | 1      | N       | drops rows failing a predicate              |
//! | [`Sorter`]     | 1      | N       | barrier, then rows ordered by a key         |
//! | [`Aggregator`] | 1      | N       | barrier, then one row per group             |
//! | [`Normalizer`] | 1      | N       | one row per trailing field                  |
//! | [`Enumerator`] | 1      | N       | prefixes rows with a running index          |
//! | [`Selector`]   | 1      | K(+1)   | routes rows to every matching condition     |
//! | [`Union`]      | M      | N       | merges inputs, round robin                  |
//! | [`Concat`]     | M      | N       | glues one row of each input side by side    |
//! | [`Split`]      | 1      | arity   | one function output row per output          |
//!
//! User functions return [`OperatorResult`]; infallible variants of every
//! constructor wrap plain closures.

use crate::error::{ExecutionError, OperatorError, OperatorResult};
use crate::value::Row;
use std::sync::Arc;

mod aggregator;
mod endpoints;
mod enumerator;
mod expression;
mod filter;
mod multi;
mod normalizer;
mod selector;
mod sorter;
mod split;

#[cfg(test)]
mod enumerator_test;
#[cfg(test)]
mod filter_test;
#[cfg(test)]
mod normalizer_test;
#[cfg(test)]
mod split_test;
#[cfg(test)]
pub(crate) mod test_support;

pub use aggregator::{Aggregator, row_count, simple_sum};
pub use endpoints::{Source, Target};
pub use enumerator::Enumerator;
pub use expression::Expression;
pub use filter::Filter;
pub use multi::{Concat, Union};
pub use normalizer::Normalizer;
pub use selector::Selector;
pub use sorter::Sorter;
pub use split::Split;

/// Shared row to row function.
pub type RowFn = Arc<dyn Fn(&Row) -> OperatorResult<Row> + Send + Sync>;

/// Shared row predicate.
pub type Predicate = Arc<dyn Fn(&Row) -> OperatorResult<bool> + Send + Sync>;

/// Shared combine function of an aggregator: `(row, accumulator) -> accumulator`.
pub type CombineFn = Arc<dyn Fn(&Row, &Row) -> OperatorResult<Row> + Send + Sync>;

pub(crate) fn predicate(f: impl Fn(&Row) -> bool + Send + Sync + 'static) -> Predicate {
  Arc::new(move |row| Ok(f(row)))
}

pub(crate) fn user_error(node: &str) -> impl FnOnce(OperatorError) -> ExecutionError + '_ {
  move |source| ExecutionError::operator(node, source)
}
