#![forbid(unsafe_code)]

//! Sort engine shared by the record and row derivations.
//!
//! Sorting is a state machine over `(sort_field, sort_direction)`. When the
//! direction is `None`, the field is empty, the field is not a column, or the
//! column has no comparator, the engine is the identity. Otherwise records are
//! stably sorted ascending by `compare(a[field], b[field])` and, for a
//! descending sort, the ascending result is reversed. Reversal (rather than a
//! flipped comparator) means runs of equal keys come out in reverse input
//! order too: `[a(1), b(1), c(2)]` descending is `[c, b, a]`.
//!
//! Sort keys are always pre-decoration values.

use tabula_core::{FieldDefinitions, SortFn, Value};
use tracing::debug;

use super::config::SortDirection;

/// One heading or one cell: the column key plus its value.
#[derive(Debug, Clone, PartialEq)]
pub struct RowValue {
    /// Column key.
    pub field: String,
    /// Heading or display value.
    pub value: Value,
}

impl RowValue {
    /// Pair a column key with a value.
    #[must_use]
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// A resolved, active sort.
pub(crate) struct SortPlan {
    pub(crate) field: String,
    compare: SortFn,
    descending: bool,
}

impl SortPlan {
    /// The active sort, or `None` when sorting is a no-op.
    pub(crate) fn resolve<T>(
        defs: &FieldDefinitions<T>,
        sort_field: &str,
        direction: SortDirection,
    ) -> Option<Self> {
        if direction == SortDirection::None || sort_field.is_empty() {
            return None;
        }
        let Some(def) = defs.get(sort_field) else {
            debug!(
                sort_field,
                "sort field is not a column; keeping original order"
            );
            return None;
        };
        let Some(compare) = def.sort.clone() else {
            debug!(
                sort_field,
                "sort field has no comparator; keeping original order"
            );
            return None;
        };
        Some(Self {
            field: sort_field.to_owned(),
            compare,
            descending: direction == SortDirection::Descending,
        })
    }
}

/// Order `items` by their keys under `plan`, dropping the keys.
///
/// `items` is already a fresh vector built by the caller, so the caller's
/// records are never touched.
pub(crate) fn sort_keyed<R>(mut items: Vec<(Value, R)>, plan: Option<&SortPlan>) -> Vec<R> {
    if let Some(plan) = plan {
        items.sort_by(|(a, _), (b, _)| (plan.compare)(a, b));
        if plan.descending {
            items.reverse();
        }
    }
    items.into_iter().map(|(_, item)| item).collect()
}
