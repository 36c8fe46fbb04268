#![forbid(unsafe_code)]

//! The reactive table store.
//!
//! A [`TableStore`] owns a table's configuration and records, exposes one
//! getter/setter pair per setting, and derives headings, records, rows and
//! the footer on demand. Every setter replaces its value wholesale and then
//! publishes exactly once through the store's [`Notifier`].
//!
//! # Derivations
//!
//! Derivations are pull-based and recomputed from current state on every
//! call; nothing is cached. The row pipeline runs synthesis, then sorting on
//! the synthesized values, then decoration:
//!
//! ```text
//! records --synthesize--> derived records --sort--> get_records() / footer()
//! records --synthesize--> sort keys + decorate --sort--> get_rows()
//! ```
//!
//! # Invariants
//!
//! 1. Column order of headings and rows is the insertion order of the field
//!    definitions.
//! 2. The record slice handed to [`TableStore::set_records`] is never mutated;
//!    [`TableStore::records`] returns that same allocation.
//! 3. A misconfigured sort (unknown column, column without comparator) keeps
//!    the original record order.
//! 4. No store borrow is held while a caller-supplied function runs, so
//!    synthesizers, decorators, comparators, footers and subscribers may read
//!    or mutate the store.
//!
//! # Failure Modes
//!
//! - Caller-supplied function panic: propagates out of the derivation (or the
//!   setter, for subscriber callbacks) that invoked it. The store stays usable.
//! - Double unsubscribe: no-op.

pub mod config;
pub mod derive;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tabula_core::{DerivedRecord, FieldDefinitions, Record, Value};
use tracing::debug;

use crate::reactive::{BatchScope, Notifier, Subscription};

pub use config::{
    ColGroup, DEFAULT_TABLE_ID, FooterFn, SortDirection, TableConfig, TableSettings,
};
pub use derive::RowValue;
use derive::{SortPlan, sort_keyed};

struct TableState<T> {
    table_id: String,
    field_defs: Rc<FieldDefinitions<T>>,
    records: Rc<[T]>,
    caption: Option<Value>,
    col_groups: Rc<[ColGroup]>,
    sort_field: String,
    sort_direction: SortDirection,
    show_header: bool,
    footer_function: Option<FooterFn<T>>,
}

/// State captured for one derivation, released from the store borrow.
struct Snapshot<T> {
    field_defs: Rc<FieldDefinitions<T>>,
    records: Rc<[T]>,
    plan: Option<SortPlan>,
}

/// Shared handle to one table's state and subscribers.
///
/// Clones refer to the same table, which is how a renderer is handed the
/// store. The handle is single-threaded (`!Send`).
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::collections::BTreeMap;
/// use std::rc::Rc;
/// use tabula_core::{FieldDefinition, FieldDefinitions, Value, numeric};
/// use tabula_runtime::{SortDirection, TableConfig, TableStore};
///
/// type Row = BTreeMap<String, Value>;
/// fn row(k: i64) -> Row {
///     BTreeMap::from([("k".to_string(), Value::Int(k))])
/// }
///
/// let store: TableStore<Row> = TableStore::new(
///     TableConfig::new()
///         .field_defs(FieldDefinitions::new().with("k", FieldDefinition::new("K").sorted_by(numeric)))
///         .records(vec![row(2), row(1)]),
/// );
///
/// let renders = Rc::new(Cell::new(0));
/// let r = Rc::clone(&renders);
/// let _sub = store.subscribe(move || r.set(r.get() + 1));
/// assert_eq!(renders.get(), 1);
///
/// store.set_sort("k", SortDirection::Ascending);
/// assert_eq!(renders.get(), 2);
///
/// let first = &store.get_rows()[0];
/// assert_eq!(first[0].value, Value::Int(1));
/// ```
pub struct TableStore<T> {
    state: Rc<RefCell<TableState<T>>>,
    notifier: Notifier,
}

impl<T> Clone for TableStore<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            notifier: self.notifier.clone(),
        }
    }
}

impl<T> Default for TableStore<T> {
    fn default() -> Self {
        Self::new(TableConfig::new())
    }
}

impl<T> TableStore<T> {
    /// Create a store, overwriting each default with the values present in `config`.
    #[must_use]
    pub fn new(config: TableConfig<T>) -> Self {
        let state = TableState {
            table_id: config
                .table_id
                .unwrap_or_else(|| DEFAULT_TABLE_ID.to_owned()),
            field_defs: Rc::new(config.field_defs.unwrap_or_default()),
            records: config.records.unwrap_or_else(|| Rc::from(Vec::new())),
            caption: config.caption,
            col_groups: config.col_groups.map_or_else(|| Rc::from(Vec::new()), Rc::from),
            sort_field: config.sort_field.unwrap_or_default(),
            sort_direction: config.sort_direction.unwrap_or_default(),
            show_header: config.show_header.unwrap_or(false),
            footer_function: config.footer_function,
        };
        Self {
            state: Rc::new(RefCell::new(state)),
            notifier: Notifier::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Getters
    // ---------------------------------------------------------------------

    /// Stable identifier used by external styling.
    #[must_use]
    pub fn table_id(&self) -> String {
        self.state.borrow().table_id.clone()
    }

    /// Column definitions.
    #[must_use]
    pub fn field_defs(&self) -> Rc<FieldDefinitions<T>> {
        Rc::clone(&self.state.borrow().field_defs)
    }

    /// Base records, exactly as handed to the store.
    #[must_use]
    pub fn records(&self) -> Rc<[T]> {
        Rc::clone(&self.state.borrow().records)
    }

    /// Caption, if any.
    #[must_use]
    pub fn caption(&self) -> Option<Value> {
        self.state.borrow().caption.clone()
    }

    /// Column-group metadata.
    #[must_use]
    pub fn col_groups(&self) -> Rc<[ColGroup]> {
        Rc::clone(&self.state.borrow().col_groups)
    }

    /// Sort column key; empty when no sort is selected.
    #[must_use]
    pub fn sort_field(&self) -> String {
        self.state.borrow().sort_field.clone()
    }

    /// Sort direction.
    #[must_use]
    pub fn sort_direction(&self) -> SortDirection {
        self.state.borrow().sort_direction
    }

    /// Whether the heading row is shown.
    #[must_use]
    pub fn show_header(&self) -> bool {
        self.state.borrow().show_header
    }

    /// Footer renderer, if any.
    #[must_use]
    pub fn footer_function(&self) -> Option<FooterFn<T>> {
        self.state.borrow().footer_function.clone()
    }

    /// The serializable part of the current configuration.
    #[must_use]
    pub fn settings(&self) -> TableSettings {
        let state = self.state.borrow();
        TableSettings {
            table_id: Some(state.table_id.clone()),
            caption: state.caption.clone(),
            col_groups: Some(state.col_groups.to_vec()),
            sort_field: Some(state.sort_field.clone()),
            sort_direction: Some(state.sort_direction),
            show_header: Some(state.show_header),
        }
    }

    // ---------------------------------------------------------------------
    // Setters
    // ---------------------------------------------------------------------

    /// Apply `change` to the state, then publish once.
    ///
    /// Whatever `change` returns (the replaced value) is dropped after the
    /// borrow is released.
    fn replace<R>(&self, change: impl FnOnce(&mut TableState<T>) -> R) {
        let replaced = change(&mut *self.state.borrow_mut());
        drop(replaced);
        self.notifier.publish();
    }

    /// Replace the table id.
    pub fn set_table_id(&self, id: impl Into<String>) {
        let id = id.into();
        self.replace(|s| std::mem::replace(&mut s.table_id, id));
    }

    /// Replace the column definitions.
    pub fn set_field_defs(&self, defs: impl Into<Rc<FieldDefinitions<T>>>) {
        let defs = defs.into();
        self.replace(|s| std::mem::replace(&mut s.field_defs, defs));
    }

    /// Replace the base records.
    ///
    /// Accepts a `Vec<T>` or a shared `Rc<[T]>`; the store keeps the
    /// allocation as given and never writes to it.
    pub fn set_records(&self, records: impl Into<Rc<[T]>>) {
        let records = records.into();
        self.replace(|s| std::mem::replace(&mut s.records, records));
    }

    /// Replace the caption.
    pub fn set_caption(&self, caption: impl Into<Value>) {
        let caption = Some(caption.into());
        self.replace(|s| std::mem::replace(&mut s.caption, caption));
    }

    /// Remove the caption.
    pub fn clear_caption(&self) {
        self.replace(|s| s.caption.take());
    }

    /// Replace the column groups.
    pub fn set_col_groups(&self, groups: impl Into<Rc<[ColGroup]>>) {
        let groups = groups.into();
        self.replace(|s| std::mem::replace(&mut s.col_groups, groups));
    }

    /// Replace the sort column key. Unknown keys are accepted and sort as a no-op.
    pub fn set_sort_field(&self, field: impl Into<String>) {
        let field = field.into();
        self.replace(|s| std::mem::replace(&mut s.sort_field, field));
    }

    /// Replace the sort direction.
    pub fn set_sort_direction(&self, direction: SortDirection) {
        self.replace(|s| s.sort_direction = direction);
    }

    /// Replace sort column and direction together, publishing once.
    pub fn set_sort(&self, field: impl Into<String>, direction: SortDirection) {
        let field = field.into();
        self.replace(|s| {
            s.sort_direction = direction;
            std::mem::replace(&mut s.sort_field, field)
        });
    }

    /// Show or hide the heading row.
    pub fn set_show_header(&self, show: bool) {
        self.replace(|s| s.show_header = show);
    }

    /// Replace the footer renderer.
    pub fn set_footer_function(&self, footer: impl Fn(&[DerivedRecord<T>]) -> Value + 'static) {
        let footer: FooterFn<T> = Rc::new(footer);
        self.replace(|s| s.footer_function.replace(footer));
    }

    /// Remove the footer renderer.
    pub fn clear_footer_function(&self) {
        self.replace(|s| s.footer_function.take());
    }

    /// Header sort-control interaction for column `field`.
    ///
    /// Selecting a different sortable column sorts it ascending; clicking the
    /// active column cycles ascending, descending, none. Returns the new
    /// direction, or `None` (without publishing) when `field` is not sortable.
    pub fn toggle_sort(&self, field: &str) -> Option<SortDirection> {
        if !self.is_sortable(field) {
            debug!(field, "toggle_sort ignored: column is not sortable");
            return None;
        }
        let next = {
            let state = self.state.borrow();
            if state.sort_field == field {
                state.sort_direction.cycle()
            } else {
                SortDirection::Ascending
            }
        };
        self.set_sort(field, next);
        Some(next)
    }

    // ---------------------------------------------------------------------
    // Subscription
    // ---------------------------------------------------------------------

    /// Register a change callback. It is signalled once before this returns.
    pub fn subscribe(&self, on_change: impl Fn() + 'static) -> Subscription {
        self.notifier.subscribe(on_change)
    }

    /// Register a change callback plus an invalidate callback that runs at
    /// the start of each publish, before any change callback.
    pub fn subscribe_with_invalidate(
        &self,
        on_change: impl Fn() + 'static,
        on_invalidate: impl Fn() + 'static,
    ) -> Subscription {
        self.notifier.subscribe_with_invalidate(on_change, on_invalidate)
    }

    /// Notify subscribers without changing state.
    pub fn publish(&self) {
        self.notifier.publish();
    }

    /// Run `f` with delivery deferred; subscribers hear about it once, at the end.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let _scope = BatchScope::new(&self.notifier);
        f()
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.notifier.subscriber_count()
    }

    /// The store's notifier, for composing with other reactive sources.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    // ---------------------------------------------------------------------
    // Derivations
    // ---------------------------------------------------------------------

    /// Column keys in display order.
    #[must_use]
    pub fn get_fields(&self) -> Vec<String> {
        self.field_defs().keys().map(str::to_owned).collect()
    }

    /// `(column key, heading)` pairs in display order.
    #[must_use]
    pub fn get_headings(&self) -> Vec<RowValue> {
        self.field_defs()
            .iter()
            .map(|(field, def)| RowValue::new(field, def.heading.clone()))
            .collect()
    }

    /// Whether `field` is a column with a comparator.
    #[must_use]
    pub fn is_sortable(&self, field: &str) -> bool {
        self.state
            .borrow()
            .field_defs
            .get(field)
            .is_some_and(|def| def.is_sortable())
    }

    /// Apply column `field`'s decorator to `value`.
    ///
    /// Identity when the column or its decorator is absent.
    #[must_use]
    pub fn decorate_field(&self, field: &str, value: Value) -> Value {
        let defs = self.field_defs();
        match defs.get(field) {
            Some(def) => def.decorate(value),
            None => value,
        }
    }

    fn snapshot(&self) -> Snapshot<T> {
        let state = self.state.borrow();
        Snapshot {
            plan: SortPlan::resolve(&state.field_defs, &state.sort_field, state.sort_direction),
            field_defs: Rc::clone(&state.field_defs),
            records: Rc::clone(&state.records),
        }
    }
}

impl<T: Record> TableStore<T> {
    /// Display rows: per record, one `(field, value)` cell per column in
    /// column order, synthesized, sorted on the pre-decoration values, then
    /// decorated.
    ///
    /// A direct column missing from the record yields `Value::Null` before
    /// decoration, so every row has one cell per column.
    #[must_use]
    pub fn get_rows(&self) -> Vec<Vec<RowValue>> {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("table_store.get_rows").entered();

        let Snapshot {
            field_defs,
            records,
            plan,
        } = self.snapshot();
        let sort_field = plan.as_ref().map(|p| p.field.as_str());

        let keyed = records
            .iter()
            .map(|record| {
                let mut sort_key = Value::Null;
                let cells = field_defs
                    .iter()
                    .map(|(field, def)| {
                        let value = def.source.resolve(field, record).unwrap_or_default();
                        if sort_field == Some(field) {
                            sort_key = value.clone();
                        }
                        RowValue::new(field, def.decorate(value))
                    })
                    .collect::<Vec<_>>();
                (sort_key, cells)
            })
            .collect();

        sort_keyed(keyed, plan.as_ref())
    }
}

impl<T: Record + Clone> TableStore<T> {
    /// Copy of `record` with every synthetic column computed.
    #[must_use]
    pub fn synthesize_fields(&self, record: &T) -> DerivedRecord<T> {
        self.field_defs().synthesize(record)
    }

    /// Synthesized records in sort order; what the footer receives.
    #[must_use]
    pub fn get_records(&self) -> Vec<DerivedRecord<T>> {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("table_store.get_records").entered();

        let Snapshot {
            field_defs,
            records,
            plan,
        } = self.snapshot();

        let keyed = records
            .iter()
            .map(|record| {
                let derived = field_defs.synthesize(record);
                let key = plan
                    .as_ref()
                    .and_then(|p| derived.field(&p.field))
                    .unwrap_or_default();
                (key, derived)
            })
            .collect();

        sort_keyed(keyed, plan.as_ref())
    }

    /// The footer row, or `None` when no footer renderer is configured.
    #[must_use]
    pub fn footer(&self) -> Option<Value> {
        let footer = self.footer_function()?;
        let records = self.get_records();
        Some(footer(&records))
    }
}

impl<T> fmt::Debug for TableStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("TableStore")
            .field("table_id", &state.table_id)
            .field("fields", &state.field_defs.keys().collect::<Vec<_>>())
            .field("records", &state.records.len())
            .field("sort_field", &state.sort_field)
            .field("sort_direction", &state.sort_direction)
            .field("subscribers", &self.notifier.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::BTreeMap;
    use tabula_core::{FieldDefinition, lexicographic, numeric};

    type Row = BTreeMap<String, Value>;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    fn people() -> Vec<Row> {
        vec![
            row(&[("name", "Sky".into()), ("age", Value::Int(40))]),
            row(&[("name", "Jill".into()), ("age", Value::Int(12))]),
            row(&[("name", "Paul".into()), ("age", Value::Int(77))]),
        ]
    }

    fn defs() -> FieldDefinitions<Row> {
        FieldDefinitions::new()
            .with("name", FieldDefinition::new("Name").sorted_by(lexicographic))
            .with("age", FieldDefinition::new("Age").sorted_by(numeric))
            .with(
                "synth",
                FieldDefinition::new("Age + 12").synthesized(|r: &Row| {
                    let age = r.field("age").and_then(|v| v.as_f64()).unwrap_or(0.0);
                    Value::Float(age + 12.0)
                }),
            )
    }

    fn store() -> TableStore<Row> {
        TableStore::new(TableConfig::new().field_defs(defs()).records(people()))
    }

    fn names(records: &[DerivedRecord<Row>]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.field("name").unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn defaults_match_empty_config() {
        let store: TableStore<Row> = TableStore::default();
        assert_eq!(store.table_id(), DEFAULT_TABLE_ID);
        assert!(store.field_defs().is_empty());
        assert!(store.records().is_empty());
        assert_eq!(store.caption(), None);
        assert!(store.col_groups().is_empty());
        assert_eq!(store.sort_field(), "");
        assert_eq!(store.sort_direction(), SortDirection::None);
        assert!(!store.show_header());
        assert!(store.footer_function().is_none());
        assert_eq!(store.footer(), None);
    }

    #[test]
    fn clones_share_state_and_subscribers() {
        let a = store();
        let b = a.clone();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let _sub = a.subscribe(move || c.set(c.get() + 1));
        b.set_table_id("shared");
        assert_eq!(a.table_id(), "shared");
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn each_setter_publishes_once() {
        let store = store();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let _sub = store.subscribe(move || c.set(c.get() + 1));
        count.set(0);

        store.set_table_id("t");
        store.set_field_defs(defs());
        store.set_records(people());
        store.set_caption("Caption");
        store.clear_caption();
        store.set_col_groups(vec![ColGroup::new(2, "g")]);
        store.set_sort_field("age");
        store.set_sort_direction(SortDirection::Ascending);
        store.set_sort("name", SortDirection::Descending);
        store.set_show_header(true);
        store.set_footer_function(|_| Value::Null);
        store.clear_footer_function();
        assert_eq!(count.get(), 12);
    }

    #[test]
    fn synthesis_feeds_sorting() {
        let store = store();
        store.set_field_defs(
            defs().with(
                "synth",
                FieldDefinition::new("Age + 12")
                    .synthesized(|r: &Row| {
                        Value::Float(r.field("age").and_then(|v| v.as_f64()).unwrap_or(0.0) + 12.0)
                    })
                    .sorted_by(numeric),
            ),
        );
        store.set_sort("synth", SortDirection::Descending);
        assert_eq!(names(&store.get_records()), ["Paul", "Sky", "Jill"]);
    }

    #[test]
    fn get_rows_sorts_on_values_not_decorations() {
        let store = store();
        // Decoration inverts the natural order of the display strings.
        store.set_field_defs(defs().with(
            "age",
            FieldDefinition::new("Age")
                .sorted_by(lexicographic)
                .decorated(|v| Value::Text(format!("{:>03}", 1000 - v.as_f64().unwrap_or(0.0) as i64))),
        ));
        store.set_sort("age", SortDirection::Ascending);
        let rows = store.get_rows();
        let names: Vec<String> = rows.iter().map(|r| r[0].value.to_string()).collect();
        assert_eq!(names, ["Jill", "Sky", "Paul"]);
        assert_eq!(rows[0][1].value, Value::from("988"));
    }

    #[test]
    fn rows_have_one_cell_per_column_in_order() {
        let store = store();
        store.set_records(vec![row(&[("name", "Eric".into())])]);
        let rows = store.get_rows();
        let fields: Vec<&str> = rows[0].iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, ["name", "age", "synth"]);
        assert_eq!(rows[0][1].value, Value::Null);
        assert_eq!(rows[0][2].value, Value::Float(12.0));
    }

    #[test]
    fn headings_pair_keys_with_headings() {
        let headings = store().get_headings();
        assert_eq!(
            headings,
            [
                RowValue::new("name", "Name"),
                RowValue::new("age", "Age"),
                RowValue::new("synth", "Age + 12"),
            ]
        );
    }

    #[test]
    fn footer_receives_sorted_synthesized_records() {
        let store = store();
        store.set_sort("age", SortDirection::Ascending);
        store.set_footer_function(|records: &[DerivedRecord<Row>]| {
            let total: f64 = records
                .iter()
                .filter_map(|r| r.field("synth").and_then(|v| v.as_f64()))
                .sum();
            let first = records
                .first()
                .and_then(|r| r.field("name"))
                .unwrap_or_default();
            Value::from(vec![first, Value::Float(total)])
        });
        assert_eq!(
            store.footer(),
            Some(Value::from(vec![Value::from("Jill"), Value::Float(165.0)]))
        );
    }

    #[test]
    fn decorate_field_uses_column_decorator() {
        let store = store();
        store.set_field_defs(defs().with(
            "name",
            FieldDefinition::new("Name").decorated(|v| Value::Text(format!("<b>{v}</b>"))),
        ));
        assert_eq!(
            store.decorate_field("name", "Jill".into()),
            Value::from("<b>Jill</b>")
        );
        assert_eq!(store.decorate_field("age", Value::Int(1)), Value::Int(1));
        assert_eq!(store.decorate_field("nope", Value::Int(1)), Value::Int(1));
    }

    #[test]
    fn toggle_sort_cycles_and_switches_columns() {
        let store = store();
        assert_eq!(store.toggle_sort("age"), Some(SortDirection::Ascending));
        assert_eq!(store.toggle_sort("age"), Some(SortDirection::Descending));
        assert_eq!(store.toggle_sort("age"), Some(SortDirection::None));
        assert_eq!(store.toggle_sort("age"), Some(SortDirection::Ascending));
        assert_eq!(store.toggle_sort("name"), Some(SortDirection::Ascending));
        assert_eq!(store.sort_field(), "name");
    }

    #[test]
    fn toggle_sort_ignores_unsortable_columns() {
        let store = store();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let _sub = store.subscribe(move || c.set(c.get() + 1));
        assert_eq!(store.toggle_sort("synth"), None);
        assert_eq!(store.toggle_sort("missing"), None);
        assert_eq!(count.get(), 1);
        assert_eq!(store.sort_field(), "");
    }

    #[test]
    fn toggle_sort_publishes_once() {
        let store = store();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let _sub = store.subscribe(move || c.set(c.get() + 1));
        store.toggle_sort("name");
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn settings_snapshot_reflects_state() {
        let store = store();
        store.set_sort("age", SortDirection::Descending);
        store.set_caption("Totals");
        let settings = store.settings();
        assert_eq!(settings.table_id.as_deref(), Some(DEFAULT_TABLE_ID));
        assert_eq!(settings.sort_field.as_deref(), Some("age"));
        assert_eq!(settings.sort_direction, Some(SortDirection::Descending));
        assert_eq!(settings.caption, Some(Value::from("Totals")));
        assert_eq!(settings.col_groups, Some(Vec::new()));
    }

    #[test]
    fn debug_lists_fields() {
        let debug = format!("{:?}", store());
        assert!(debug.contains("\"name\", \"age\", \"synth\""));
        assert!(debug.contains("records: 3"));
    }
}
