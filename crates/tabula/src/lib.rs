#![forbid(unsafe_code)]

//! tabula public facade.
//!
//! Re-exports the column model from `tabula-core` and the reactive store
//! from `tabula-runtime`. Most applications only need the [`prelude`].
//!
//! ```
//! use std::collections::BTreeMap;
//! use tabula::prelude::*;
//!
//! type Row = BTreeMap<String, Value>;
//!
//! let defs = FieldDefinitions::new()
//!     .with("name", FieldDefinition::new("Name").sorted_by(lexicographic))
//!     .with(
//!         "shout",
//!         FieldDefinition::new("Shout").synthesized(|r: &Row| {
//!             Value::Text(r.field("name").unwrap_or_default().to_string().to_uppercase())
//!         }),
//!     );
//! let store: TableStore<Row> = TableStore::new(
//!     TableConfig::new()
//!         .field_defs(defs)
//!         .records(vec![
//!             BTreeMap::from([("name".to_string(), Value::from("jill"))]),
//!             BTreeMap::from([("name".to_string(), Value::from("eric"))]),
//!         ])
//!         .sort_field("name")
//!         .sort_direction(SortDirection::Ascending),
//! );
//!
//! let rows = store.get_rows();
//! assert_eq!(rows[0][1].value, Value::from("ERIC"));
//! ```

pub use tabula_core as core;
pub use tabula_runtime as runtime;

pub use tabula_core::{
    DerivedRecord, FieldDefinition, FieldDefinitions, FieldSource, Record, SortFn, Value,
    lexicographic, numeric,
};
pub use tabula_runtime::{
    BatchScope, ColGroup, DEFAULT_TABLE_ID, FooterFn, Notifier, RowValue, SortDirection,
    Subscription, TableConfig, TableError, TableSettings, TableStore,
};

/// Everything needed to define columns and drive a store.
pub mod prelude {
    pub use tabula_core::{
        DerivedRecord, FieldDefinition, FieldDefinitions, Record, Value, lexicographic, numeric,
    };
    pub use tabula_runtime::{
        ColGroup, RowValue, SortDirection, Subscription, TableConfig, TableStore,
    };
}
