//! # Values and Rows
//!
//! A [`Row`] is an immutable, ordered tuple of atomic [`Value`]s. Rows are
//! reference counted so that fanning a row out to several downstream channels
//! only bumps a counter.
//!
//! No schema is attached to a row: operators only rely on the arity their
//! user functions expect.
//!
//! ## Ordering
//!
//! Values are totally ordered so rows can serve as sort and grouping keys.
//! Integers and floats compare by numeric value, so `Int(1) == Float(1.0)`.
//! Other values of different kinds order by kind first
//! (`Null < Bool < numbers < Str < Date < Time < Timestamp`). NaNs sit
//! outside the numbers, ordered by sign.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;
use thiserror::Error;

/// An atomic field of a [`Row`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
  /// Absent value.
  Null,
  /// Boolean.
  Bool(bool),
  /// Signed integer.
  Int(i64),
  /// Floating point number.
  Float(f64),
  /// UTF-8 string.
  Str(String),
  /// Calendar date.
  Date(NaiveDate),
  /// Time of day.
  Time(NaiveTime),
  /// Date and time without timezone.
  Timestamp(NaiveDateTime),
}

/// Error raised by value arithmetic and conversions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
  /// The two operands cannot be combined.
  #[error("cannot add {0} and {1}")]
  IncompatibleOperands(String, String),
  /// Integer overflow.
  #[error("integer overflow")]
  Overflow,
  /// A field index is out of the row bounds.
  #[error("field {index} out of range for a row of arity {arity}")]
  FieldOutOfRange {
    /// Requested index.
    index: usize,
    /// Row arity.
    arity: usize,
  },
}

impl Value {
  fn rank(&self) -> u8 {
    match self {
      Value::Null => 0,
      Value::Bool(_) => 1,
      Value::Int(_) => 2,
      Value::Float(_) => 3,
      Value::Str(_) => 4,
      Value::Date(_) => 5,
      Value::Time(_) => 6,
      Value::Timestamp(_) => 7,
    }
  }

  /// Returns a short name for the kind of this value.
  pub fn kind(&self) -> &'static str {
    match self {
      Value::Null => "null",
      Value::Bool(_) => "bool",
      Value::Int(_) => "int",
      Value::Float(_) => "float",
      Value::Str(_) => "str",
      Value::Date(_) => "date",
      Value::Time(_) => "time",
      Value::Timestamp(_) => "timestamp",
    }
  }

  /// Returns `true` for [`Value::Null`].
  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }

  /// Returns the integer held by this value, if any.
  pub fn as_int(&self) -> Option<i64> {
    match self {
      Value::Int(i) => Some(*i),
      _ => None,
    }
  }

  /// Returns this value as a float, widening integers.
  pub fn as_float(&self) -> Option<f64> {
    match self {
      Value::Int(i) => Some(*i as f64),
      Value::Float(f) => Some(*f),
      _ => None,
    }
  }

  /// Returns the string held by this value, if any.
  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::Str(s) => Some(s),
      _ => None,
    }
  }

  /// Returns the boolean held by this value, if any.
  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }

  /// Renders the value as a bare text field, without quoting strings.
  pub fn to_field(&self) -> String {
    match self {
      Value::Null => String::new(),
      Value::Str(s) => s.clone(),
      other => other.to_string(),
    }
  }

  /// Adds two numeric values. Integers stay integers unless mixed with a float.
  pub fn try_add(&self, other: &Value) -> Result<Value, ValueError> {
    match (self, other) {
      (Value::Int(a), Value::Int(b)) => a.checked_add(*b).map(Value::Int).ok_or(ValueError::Overflow),
      (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
      (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 + b)),
      (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a + *b as f64)),
      (a, b) => Err(ValueError::IncompatibleOperands(
        a.kind().to_string(),
        b.kind().to_string(),
      )),
    }
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for Value {}

impl PartialOrd for Value {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Value {
  fn cmp(&self, other: &Self) -> Ordering {
    match (self, other) {
      (Value::Null, Value::Null) => Ordering::Equal,
      (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
      (Value::Int(a), Value::Int(b)) => a.cmp(b),
      (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or_else(|| a.total_cmp(b)),
      (Value::Int(a), Value::Float(b)) => cmp_int_float(*a, *b),
      (Value::Float(a), Value::Int(b)) => cmp_int_float(*b, *a).reverse(),
      (Value::Str(a), Value::Str(b)) => a.cmp(b),
      (Value::Date(a), Value::Date(b)) => a.cmp(b),
      (Value::Time(a), Value::Time(b)) => a.cmp(b),
      (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
      (a, b) => a.rank().cmp(&b.rank()),
    }
  }
}

/// Exact comparison of an integer with a float, without rounding the
/// integer.
fn cmp_int_float(i: i64, f: f64) -> Ordering {
  if f.is_nan() {
    return if f.is_sign_negative() { Ordering::Greater } else { Ordering::Less };
  }
  if f >= I64_UPPER {
    return Ordering::Less;
  }
  if f < -I64_UPPER {
    return Ordering::Greater;
  }
  let whole = f.trunc();
  i.cmp(&(whole as i64)).then_with(|| {
    if f > whole {
      Ordering::Less
    } else if f < whole {
      Ordering::Greater
    } else {
      Ordering::Equal
    }
  })
}

/// 2^63, the first float above every `i64`.
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

/// The integer equal to `f`, if any.
fn integral(f: f64) -> Option<i64> {
  (f.trunc() == f && (-I64_UPPER..I64_UPPER).contains(&f)).then_some(f as i64)
}

impl Hash for Value {
  fn hash<H: Hasher>(&self, state: &mut H) {
    // Equal numbers hash alike whatever their kind.
    match self {
      Value::Float(_) => Value::Int(0).rank().hash(state),
      other => other.rank().hash(state),
    }
    match self {
      Value::Null => {}
      Value::Bool(b) => b.hash(state),
      Value::Int(i) => i.hash(state),
      Value::Float(f) => match integral(*f) {
        Some(i) => i.hash(state),
        None => f.to_bits().hash(state),
      },
      Value::Str(s) => s.hash(state),
      Value::Date(d) => d.hash(state),
      Value::Time(t) => t.hash(state),
      Value::Timestamp(ts) => ts.hash(state),
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Null => write!(f, "None"),
      Value::Bool(b) => write!(f, "{}", b),
      Value::Int(i) => write!(f, "{}", i),
      Value::Float(x) => write!(f, "{}", x),
      Value::Str(s) => write!(f, "'{}'", s),
      Value::Date(d) => write!(f, "{}", d),
      Value::Time(t) => write!(f, "{}", t),
      Value::Timestamp(ts) => write!(f, "{}", ts),
    }
  }
}

macro_rules! impl_from {
  ($($ty:ty => $variant:ident),* $(,)?) => {
    $(
      impl From<$ty> for Value {
        fn from(v: $ty) -> Self {
          Value::$variant(v.into())
        }
      }
    )*
  };
}

impl_from! {
  bool => Bool,
  i64 => Int,
  i32 => Int,
  u32 => Int,
  f64 => Float,
  f32 => Float,
  String => Str,
  &str => Str,
  NaiveDate => Date,
  NaiveTime => Time,
  NaiveDateTime => Timestamp,
}

impl From<usize> for Value {
  fn from(v: usize) -> Self {
    Value::Int(v as i64)
  }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self {
    v.map_or(Value::Null, Into::into)
  }
}

/// An immutable tuple of values.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Row(Arc<[Value]>);

impl Row {
  /// Returns the row with no field.
  pub fn empty() -> Self {
    Row(Arc::from(Vec::new()))
  }

  /// Returns the field at `index` or an error naming the row arity.
  pub fn field(&self, index: usize) -> Result<&Value, ValueError> {
    self.0.get(index).ok_or(ValueError::FieldOutOfRange {
      index,
      arity: self.0.len(),
    })
  }

  /// Returns a new row made of `value` followed by the fields of this row.
  pub fn prepend(&self, value: Value) -> Row {
    std::iter::once(value).chain(self.0.iter().cloned()).collect()
  }

  /// Concatenates the fields of several rows positionally.
  pub fn concat<'a>(rows: impl IntoIterator<Item = &'a Row>) -> Row {
    rows.into_iter().flat_map(|r| r.0.iter().cloned()).collect()
  }

  /// Returns the fields of the row as a slice.
  pub fn values(&self) -> &[Value] {
    &self.0
  }
}

impl Deref for Row {
  type Target = [Value];

  fn deref(&self) -> &[Value] {
    &self.0
  }
}

impl From<Vec<Value>> for Row {
  fn from(values: Vec<Value>) -> Self {
    Row(Arc::from(values))
  }
}

impl From<&[Value]> for Row {
  fn from(values: &[Value]) -> Self {
    Row(Arc::from(values))
  }
}

impl FromIterator<Value> for Row {
  fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
    Row(iter.into_iter().collect())
  }
}

impl fmt::Debug for Row {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(self, f)
  }
}

impl fmt::Display for Row {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "(")?;
    for (i, v) in self.0.iter().enumerate() {
      if i > 0 {
        write!(f, ", ")?;
      }
      write!(f, "{}", v)?;
    }
    if self.0.len() == 1 {
      write!(f, ",")?;
    }
    write!(f, ")")
  }
}

/// Builds a [`Row`] from expressions convertible into [`Value`].
///
/// ```
/// use gibbon::{row, Value};
///
/// let r = row![1, "Henry", 2.5];
/// assert_eq!(r.len(), 3);
/// assert_eq!(r[1], Value::from("Henry"));
/// ```
#[macro_export]
macro_rules! row {
  () => {
    $crate::Row::empty()
  };
  ($($value:expr),+ $(,)?) => {
    $crate::Row::from(vec![$($crate::Value::from($value)),+])
  };
}
