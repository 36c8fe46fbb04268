#![forbid(unsafe_code)]

//! Column definitions, record lookup, and comparators for tabula tables.
//!
//! This is the leaf crate: it knows nothing about stores or subscribers.
//!
//! - [`Value`]: dynamic cell value with a total natural order.
//! - [`Record`]: keyed field lookup implemented by row types.
//! - [`FieldDefinition`] / [`FieldDefinitions`]: ordered per-column metadata.
//! - [`lexicographic`] / [`numeric`]: ready-made comparators.

pub mod field;
pub mod record;
pub mod sort;
pub mod value;

pub use field::{Decorator, FieldDefinition, FieldDefinitions, FieldSource, Synthesizer};
pub use record::{DerivedRecord, Record};
pub use sort::{SortFn, lexicographic, numeric};
pub use value::Value;
