#![forbid(unsafe_code)]

//! Keyed access to row records.
//!
//! Records are whatever the caller stores in a table. The derivation
//! pipeline never indexes them directly; it asks for a column through
//! [`Record::field`], which lets a column exist on the record, be missing, or
//! be synthesized from the whole record.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::rc::Rc;

use crate::value::Value;

/// Lookup of a column value by key.
///
/// Returning `None` means the record has no such field. Synthetic columns
/// never go through this trait for their own key; see
/// [`FieldSource`](crate::field::FieldSource).
///
/// # Example
///
/// ```
/// use tabula_core::{Record, Value};
///
/// struct Person {
///     name: String,
///     age: i64,
/// }
///
/// impl Record for Person {
///     fn field(&self, key: &str) -> Option<Value> {
///         match key {
///             "name" => Some(self.name.as_str().into()),
///             "age" => Some(self.age.into()),
///             _ => None,
///         }
///     }
/// }
///
/// let p = Person { name: "Jill".into(), age: 30 };
/// assert_eq!(p.field("age"), Some(Value::Int(30)));
/// assert_eq!(p.field("email"), None);
/// ```
pub trait Record {
    /// Value stored under `key`, if any.
    fn field(&self, key: &str) -> Option<Value>;
}

impl Record for BTreeMap<String, Value> {
    fn field(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

impl<S: BuildHasher> Record for HashMap<String, Value, S> {
    fn field(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

impl<R: Record + ?Sized> Record for &R {
    fn field(&self, key: &str) -> Option<Value> {
        (**self).field(key)
    }
}

impl<R: Record + ?Sized> Record for Rc<R> {
    fn field(&self, key: &str) -> Option<Value> {
        (**self).field(key)
    }
}

/// A record with its synthesized columns applied.
///
/// Holds an owned copy of the base record plus one value per synthetic
/// column. Synthesized values shadow base fields of the same key, so the
/// derived record reads like a shallow copy of the base with those keys
/// overwritten. The base record is never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRecord<T> {
    base: T,
    synthesized: Vec<(String, Value)>,
}

impl<T> DerivedRecord<T> {
    /// Wrap `base` with no synthesized columns.
    #[must_use]
    pub const fn new(base: T) -> Self {
        Self {
            base,
            synthesized: Vec::new(),
        }
    }

    /// Set a synthesized value, replacing an earlier one for the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.synthesized.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.synthesized.push((key, value)),
        }
    }

    /// The unmodified base record.
    #[must_use]
    pub const fn base(&self) -> &T {
        &self.base
    }

    /// Consume the wrapper, returning the base record.
    #[must_use]
    pub fn into_base(self) -> T {
        self.base
    }

    /// The synthesized value for `key`, ignoring the base record.
    #[must_use]
    pub fn synthesized(&self, key: &str) -> Option<&Value> {
        self.synthesized
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Synthesized `(key, value)` pairs in column order.
    pub fn synthesized_fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.synthesized.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<T: Record> Record for DerivedRecord<T> {
    fn field(&self, key: &str) -> Option<Value> {
        match self.synthesized(key) {
            Some(value) => Some(value.clone()),
            None => self.base.field(key),
        }
    }
}
