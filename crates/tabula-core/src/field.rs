#![forbid(unsafe_code)]

//! Per-column metadata.
//!
//! A [`FieldDefinition`] describes one column: the heading to display, where
//! the column's value comes from ([`FieldSource`]), an optional decorator that
//! turns the value into its display form, and an optional comparator that
//! makes the column sortable. [`FieldDefinitions`] keeps the columns in
//! insertion order, which is the display order of every derived view.
//!
//! # Invariants
//!
//! 1. Iteration order of [`FieldDefinitions`] is insertion order. Replacing an
//!    existing key keeps its original position.
//! 2. A `Direct` column resolves to `record.field(key)`; a `Synthetic` column
//!    always resolves to `synthesizer(record)` and never reads its own key.
//! 3. Definitions are pure data; construction never fails.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::record::{DerivedRecord, Record};
use crate::sort::SortFn;
use crate::value::Value;

/// Computes a column value from a whole record.
pub type Synthesizer<T> = Rc<dyn Fn(&T) -> Value>;

/// Wraps a resolved cell value for presentation.
pub type Decorator = Rc<dyn Fn(&Value) -> Value>;

/// Where a column's value comes from.
pub enum FieldSource<T> {
    /// Read the record's own field under the column key.
    Direct,
    /// Compute the value from the whole record.
    Synthetic(Synthesizer<T>),
}

impl<T> FieldSource<T> {
    /// Whether the column is computed rather than read.
    #[must_use]
    pub const fn is_synthetic(&self) -> bool {
        matches!(self, Self::Synthetic(_))
    }
}

impl<T: Record> FieldSource<T> {
    /// The column's pre-decoration value for `record`.
    ///
    /// `None` only for a direct column whose key the record lacks.
    pub fn resolve(&self, key: &str, record: &T) -> Option<Value> {
        match self {
            Self::Direct => record.field(key),
            Self::Synthetic(synthesize) => Some(synthesize(record)),
        }
    }
}

impl<T> Clone for FieldSource<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Direct => Self::Direct,
            Self::Synthetic(f) => Self::Synthetic(Rc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for FieldSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("Direct"),
            Self::Synthetic(_) => f.write_str("Synthetic(..)"),
        }
    }
}

/// Column configuration.
///
/// # Examples
///
/// ```
/// use tabula_core::{FieldDefinition, Value, numeric};
///
/// #[derive(Clone)]
/// struct Person { age: i64 }
///
/// impl tabula_core::Record for Person {
///     fn field(&self, key: &str) -> Option<Value> {
///         (key == "age").then(|| self.age.into())
///     }
/// }
///
/// let age = FieldDefinition::<Person>::new("Age").sorted_by(numeric);
/// let next = FieldDefinition::<Person>::new("Age + 12")
///     .synthesized(|p| Value::Int(p.age + 12))
///     .decorated(|v| Value::Text(format!("<b>{v}</b>")));
///
/// assert!(age.is_sortable());
/// assert!(!next.is_sortable());
/// assert_eq!(next.decorate(Value::Int(42)), Value::from("<b>42</b>"));
/// ```
pub struct FieldDefinition<T> {
    /// Heading shown for the column. Never inspected by the store.
    pub heading: Value,
    /// How the column value is obtained.
    pub source: FieldSource<T>,
    /// Optional presentation transform applied after synthesis and sorting.
    pub decorator: Option<Decorator>,
    /// Optional comparator; its presence makes the column sortable.
    pub sort: Option<SortFn>,
}

impl<T> FieldDefinition<T> {
    /// A direct, undecorated, unsortable column.
    #[must_use]
    pub fn new(heading: impl Into<Value>) -> Self {
        Self {
            heading: heading.into(),
            source: FieldSource::Direct,
            decorator: None,
            sort: None,
        }
    }

    /// Compute this column from the whole record.
    #[must_use]
    pub fn synthesized(mut self, synthesizer: impl Fn(&T) -> Value + 'static) -> Self {
        self.source = FieldSource::Synthetic(Rc::new(synthesizer));
        self
    }

    /// Transform resolved values for display.
    #[must_use]
    pub fn decorated(mut self, decorator: impl Fn(&Value) -> Value + 'static) -> Self {
        self.decorator = Some(Rc::new(decorator));
        self
    }

    /// Make the column sortable with `compare`.
    #[must_use]
    pub fn sorted_by(mut self, compare: impl Fn(&Value, &Value) -> Ordering + 'static) -> Self {
        self.sort = Some(Rc::new(compare));
        self
    }

    /// Whether the column has a comparator.
    #[must_use]
    pub const fn is_sortable(&self) -> bool {
        self.sort.is_some()
    }

    /// Whether the column is synthesized.
    #[must_use]
    pub const fn is_synthetic(&self) -> bool {
        self.source.is_synthetic()
    }

    /// Apply the decorator, or return `value` unchanged when there is none.
    #[must_use]
    pub fn decorate(&self, value: Value) -> Value {
        match &self.decorator {
            Some(decorate) => decorate(&value),
            None => value,
        }
    }
}

impl<T> Default for FieldDefinition<T> {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}

impl<T> Clone for FieldDefinition<T> {
    fn clone(&self) -> Self {
        Self {
            heading: self.heading.clone(),
            source: self.source.clone(),
            decorator: self.decorator.clone(),
            sort: self.sort.clone(),
        }
    }
}

impl<T> fmt::Debug for FieldDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("heading", &self.heading)
            .field("source", &self.source)
            .field("decorated", &self.decorator.is_some())
            .field("sortable", &self.sort.is_some())
            .finish()
    }
}

/// Ordered mapping from column key to [`FieldDefinition`].
///
/// Column counts are small, so lookups are linear scans over the entry list.
pub struct FieldDefinitions<T> {
    entries: Vec<(String, FieldDefinition<T>)>,
}

impl<T> FieldDefinitions<T> {
    /// An empty column set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add or replace a column, returning `self` for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, definition: FieldDefinition<T>) -> Self {
        self.insert(key, definition);
        self
    }

    /// Add a column at the end, or replace an existing one in place.
    ///
    /// Returns the replaced definition, if any.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        definition: FieldDefinition<T>,
    ) -> Option<FieldDefinition<T>> {
        let key = key.into();
        if let Some((_, slot)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(slot, definition));
        }
        self.entries.push((key, definition));
        None
    }

    /// Definition for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldDefinition<T>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, def)| def)
    }

    /// Whether `key` is a column.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Column keys in display order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// `(key, definition)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldDefinition<T>)> {
        self.entries.iter().map(|(k, def)| (k.as_str(), def))
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Record + Clone> FieldDefinitions<T> {
    /// Copy `record`, overwriting every synthetic column with its computed value.
    ///
    /// Synthesizers see the original record, never a partially synthesized one.
    pub fn synthesize(&self, record: &T) -> DerivedRecord<T> {
        let mut derived = DerivedRecord::new(record.clone());
        for (key, def) in &self.entries {
            if let FieldSource::Synthetic(synthesize) = &def.source {
                derived.insert(key.as_str(), synthesize(record));
            }
        }
        derived
    }
}

impl<T> Default for FieldDefinitions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for FieldDefinitions<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T> fmt::Debug for FieldDefinitions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl<T, K: Into<String>> FromIterator<(K, FieldDefinition<T>)> for FieldDefinitions<T> {
    fn from_iter<I: IntoIterator<Item = (K, FieldDefinition<T>)>>(iter: I) -> Self {
        let mut defs = Self::new();
        for (key, def) in iter {
            defs.insert(key, def);
        }
        defs
    }
}

impl<T, K: Into<String>> Extend<(K, FieldDefinition<T>)> for FieldDefinitions<T> {
    fn extend<I: IntoIterator<Item = (K, FieldDefinition<T>)>>(&mut self, iter: I) {
        for (key, def) in iter {
            self.insert(key, def);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::{lexicographic, numeric};
    use std::collections::BTreeMap;

    type Row = BTreeMap<String, Value>;

    fn row(age: i64) -> Row {
        let mut r = Row::new();
        r.insert("age".into(), Value::Int(age));
        r.insert("name".into(), Value::from("Jill"));
        r
    }

    #[test]
    fn keys_follow_insertion_order() {
        let defs: FieldDefinitions<Row> = FieldDefinitions::new()
            .with("name", FieldDefinition::new("Name"))
            .with("age", FieldDefinition::new("Age"))
            .with("id", FieldDefinition::new("ID"));
        assert_eq!(defs.keys().collect::<Vec<_>>(), ["name", "age", "id"]);
    }

    #[test]
    fn replacing_keeps_position() {
        let mut defs: FieldDefinitions<Row> = [
            ("a", FieldDefinition::new("A")),
            ("b", FieldDefinition::new("B")),
        ]
        .into_iter()
        .collect();
        let old = defs.insert("a", FieldDefinition::new("A2").sorted_by(numeric));
        assert_eq!(old.map(|d| d.heading), Some(Value::from("A")));
        assert_eq!(defs.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert!(defs.get("a").is_some_and(FieldDefinition::is_sortable));
        assert_eq!(defs.len(), 2);
    }

    #[test]
    fn direct_source_reads_record() {
        let src = FieldSource::<Row>::Direct;
        assert_eq!(src.resolve("age", &row(4)), Some(Value::Int(4)));
        assert_eq!(src.resolve("missing", &row(4)), None);
    }

    #[test]
    fn synthetic_source_ignores_own_key() {
        let def = FieldDefinition::<Row>::new("Age + 12")
            .synthesized(|r| Value::Int(r.field("age").and_then(|v| v.as_f64()).unwrap_or(0.0) as i64 + 12));
        assert_eq!(def.source.resolve("age", &row(30)), Some(Value::Int(42)));
        assert!(def.is_synthetic());
    }

    #[test]
    fn synthesize_overwrites_only_synthetic_columns() {
        let defs: FieldDefinitions<Row> = FieldDefinitions::new()
            .with("name", FieldDefinition::new("Name").sorted_by(lexicographic))
            .with(
                "age",
                FieldDefinition::new("Age").synthesized(|_| Value::Int(0)),
            )
            .with(
                "synth",
                FieldDefinition::new("Synth").synthesized(|r: &Row| {
                    Value::from(vec![r.field("name").unwrap_or_default(), r.field("age").unwrap_or_default()])
                }),
            );
        let base = row(9);
        let derived = defs.synthesize(&base);
        assert_eq!(derived.field("name"), Some(Value::from("Jill")));
        assert_eq!(derived.field("age"), Some(Value::Int(0)));
        // Synthesizers see the original record, not the overwritten age.
        assert_eq!(
            derived.field("synth"),
            Some(Value::from(vec![Value::from("Jill"), Value::Int(9)]))
        );
        assert_eq!(base.field("age"), Some(Value::Int(9)));
    }

    #[test]
    fn decorate_without_decorator_is_identity() {
        let def = FieldDefinition::<Row>::new("x");
        assert_eq!(def.decorate(Value::Int(1)), Value::Int(1));
    }

    #[test]
    fn debug_hides_closures() {
        let def = FieldDefinition::<Row>::new("Age")
            .synthesized(|_| Value::Null)
            .sorted_by(numeric);
        let debug = format!("{def:?}");
        assert!(debug.contains("Synthetic(..)"));
        assert!(debug.contains("sortable: true"));
    }
}
