#![no_main]

//! Arbitrary records, sort column and direction through `get_records` and
//! `get_rows`: derivations must not panic, must keep every record, must not
//! touch the caller's slice and must agree with each other on order.

use std::collections::BTreeMap;
use std::rc::Rc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tabula_core::{FieldDefinition, FieldDefinitions, Record, Value, lexicographic, numeric};
use tabula_runtime::{SortDirection, TableConfig, TableStore};

#[derive(Debug, Arbitrary)]
enum Cell {
    Missing,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Arbitrary)]
enum Direction {
    Ascending,
    Descending,
    None,
}

#[derive(Debug, Arbitrary)]
struct Input {
    cells: Vec<(Cell, Cell)>,
    sort_field: u8,
    direction: Direction,
}

type Row = BTreeMap<String, Value>;

const FIELDS: [&str; 5] = ["a", "b", "sum", "plain", "nope"];

fn to_value(cell: Cell) -> Option<Value> {
    match cell {
        Cell::Missing => None,
        Cell::Null => Some(Value::Null),
        Cell::Bool(b) => Some(Value::Bool(b)),
        Cell::Int(i) => Some(Value::Int(i)),
        Cell::Float(f) => Some(Value::Float(f)),
        Cell::Text(s) => Some(Value::Text(s)),
    }
}

fuzz_target!(|input: Input| {
    let records: Vec<Row> = input
        .cells
        .into_iter()
        .take(256)
        .enumerate()
        .map(|(i, (a, b))| {
            let mut row = BTreeMap::from([("idx".to_string(), Value::Int(i as i64))]);
            if let Some(a) = to_value(a) {
                row.insert("a".into(), a);
            }
            if let Some(b) = to_value(b) {
                row.insert("b".into(), b);
            }
            row
        })
        .collect();
    let records: Rc<[Row]> = Rc::from(records);
    // Debug text rather than `==`: NaN cells never equal themselves.
    let snapshot = format!("{records:?}");

    let defs = FieldDefinitions::new()
        .with("idx", FieldDefinition::new("#"))
        .with("a", FieldDefinition::new("A").sorted_by(lexicographic))
        .with("b", FieldDefinition::new("B").sorted_by(numeric))
        .with(
            "sum",
            FieldDefinition::new("A + B")
                .synthesized(|r: &Row| {
                    let a = r.field("a").and_then(|v| v.as_f64()).unwrap_or(0.0);
                    let b = r.field("b").and_then(|v| v.as_f64()).unwrap_or(0.0);
                    Value::Float(a + b)
                })
                .sorted_by(numeric),
        )
        .with("plain", FieldDefinition::new("Plain"));

    let direction = match input.direction {
        Direction::Ascending => SortDirection::Ascending,
        Direction::Descending => SortDirection::Descending,
        Direction::None => SortDirection::None,
    };
    let store = TableStore::new(
        TableConfig::new()
            .field_defs(defs)
            .records(Rc::clone(&records))
            .sort_field(FIELDS[input.sort_field as usize % FIELDS.len()])
            .sort_direction(direction),
    );

    let derived = store.get_records();
    let rows = store.get_rows();
    assert_eq!(derived.len(), records.len());
    assert_eq!(rows.len(), records.len());
    for (record, row) in derived.iter().zip(&rows) {
        assert_eq!(row.len(), 5);
        assert_eq!(record.field("idx"), Some(row[0].value.clone()));
    }

    let mut seen: Vec<i64> = derived
        .iter()
        .filter_map(|r| match r.field("idx") {
            Some(Value::Int(i)) => Some(i),
            _ => None,
        })
        .collect();
    seen.sort_unstable();
    assert!(seen.iter().copied().eq(0..records.len() as i64));

    assert!(Rc::ptr_eq(&store.records(), &records));
    assert_eq!(format!("{records:?}"), snapshot);
});
