#![forbid(unsafe_code)]

//! Reusable column comparators.
//!
//! A comparator receives the resolved (post-synthesis, pre-decoration) values
//! of one column for two records. [`Ordering::Less`] places `a` before `b`.
//! Attaching any comparator to a [`FieldDefinition`](crate::FieldDefinition)
//! makes that column sortable.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::value::Value;

/// Shared comparator over two column values.
pub type SortFn = Rc<dyn Fn(&Value, &Value) -> Ordering>;

/// Three-way comparison using the default ordering of the underlying values.
///
/// Strings compare lexicographically by code point; other variants use
/// [`Value::natural_cmp`]. Numbers compare as `f64`, so integers beyond
/// 2^53 that round to the same float compare equal.
#[must_use]
pub fn lexicographic(a: &Value, b: &Value) -> Ordering {
    a.natural_cmp(b)
}

/// Numeric comparison, the sign of `a - b`.
///
/// Values without a numeric view (text, lists, `Null`) sort after every
/// number and compare equal among themselves, so their relative order is
/// left to the stable sort. `NaN` sorts after the other numbers.
#[must_use]
pub fn numeric(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
