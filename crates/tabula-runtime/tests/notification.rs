//! Subscriber notification through the store: immediate signal, one signal
//! per mutation, batching and re-entrant publishes.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use tabula_core::{FieldDefinition, FieldDefinitions, Value, numeric};
use tabula_runtime::{SortDirection, TableConfig, TableStore};

type Row = BTreeMap<String, Value>;

fn store() -> TableStore<Row> {
    TableStore::new(
        TableConfig::new()
            .field_defs(FieldDefinitions::new().with("n", FieldDefinition::new("N").sorted_by(numeric)))
            .records(vec![BTreeMap::from([("n".to_string(), Value::Int(1))])]),
    )
}

fn counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
    let count = Rc::new(Cell::new(0));
    let c = Rc::clone(&count);
    (count, move || c.set(c.get() + 1))
}

#[test]
fn subscribe_signals_before_returning() {
    let store = store();
    let (count, on_change) = counter();
    let _sub = store.subscribe(on_change);
    assert_eq!(count.get(), 1);
}

#[test]
fn single_setter_notifies_once() {
    let store = store();
    let (count, on_change) = counter();
    let _sub = store.subscribe(on_change);
    count.set(0);

    store.set_caption("Totals");
    assert_eq!(count.get(), 1);
}

#[test]
fn independent_setters_notify_once_each() {
    let store = store();
    let (count, on_change) = counter();
    let _sub = store.subscribe(on_change);
    count.set(0);

    store.set_sort_field("n");
    store.set_sort_direction(SortDirection::Descending);
    store.set_show_header(true);
    assert_eq!(count.get(), 3);
}

#[test]
fn batched_setters_notify_once() {
    let store = store();
    let (count, on_change) = counter();
    let _sub = store.subscribe(on_change);
    count.set(0);

    store.batch(|| {
        store.set_sort_field("n");
        store.set_sort_direction(SortDirection::Descending);
        store.set_show_header(true);
        assert_eq!(count.get(), 0);
    });
    assert_eq!(count.get(), 1);
}

#[test]
fn nested_batches_flush_at_the_outermost_scope() {
    let store = store();
    let (count, on_change) = counter();
    let _sub = store.subscribe(on_change);
    count.set(0);

    store.batch(|| {
        store.set_table_id("a");
        store.batch(|| store.set_table_id("b"));
        assert_eq!(count.get(), 0);
    });
    assert_eq!(count.get(), 1);
    assert_eq!(store.table_id(), "b");
}

#[test]
fn reentrant_publish_joins_the_running_flush() {
    let store = store();
    let armed = Rc::new(Cell::new(false));
    let first_calls = Rc::new(Cell::new(0u32));

    let handle = store.clone();
    let (a, f) = (Rc::clone(&armed), Rc::clone(&first_calls));
    let _first = store.subscribe(move || {
        f.set(f.get() + 1);
        if a.replace(false) {
            handle.set_caption("from subscriber");
        }
    });
    let (second_calls, on_change) = counter();
    let _second = store.subscribe(on_change);

    first_calls.set(0);
    second_calls.set(0);
    armed.set(true);
    store.set_show_header(true);

    // The second subscriber was still queued when the first one mutated the
    // store, so both mutations reach it as a single signal.
    assert_eq!(second_calls.get(), 1);
    assert_eq!(first_calls.get(), 2);
    assert_eq!(store.caption(), Some(Value::from("from subscriber")));
    assert!(!store.notifier().is_draining());
}

#[test]
fn delivery_order_is_registration_order() {
    let store = store();
    let log = Rc::new(RefCell::new(Vec::new()));
    let subs: Vec<_> = (0..3)
        .map(|i| {
            let log = Rc::clone(&log);
            store.subscribe(move || log.borrow_mut().push(i))
        })
        .collect();
    log.borrow_mut().clear();

    store.publish();
    assert_eq!(*log.borrow(), [0, 1, 2]);
    drop(subs);
}

#[test]
fn invalidate_precedes_every_change_callback() {
    let store = store();
    let log = Rc::new(RefCell::new(Vec::<&str>::new()));
    let mut subs = Vec::new();
    for name in ["a", "b"] {
        let (on_change_log, on_invalidate_log) = (Rc::clone(&log), Rc::clone(&log));
        subs.push(store.subscribe_with_invalidate(
            move || on_change_log.borrow_mut().push(name),
            move || on_invalidate_log.borrow_mut().push("invalidate"),
        ));
    }
    log.borrow_mut().clear();

    store.set_records(Vec::new());
    assert_eq!(*log.borrow(), ["invalidate", "invalidate", "a", "b"]);
}

#[test]
fn mutation_from_invalidate_callback_notifies_once() {
    let store = store();
    let log = Rc::new(RefCell::new(Vec::<&str>::new()));
    let armed = Rc::new(Cell::new(false));

    let (a_change, a_invalidate) = (Rc::clone(&log), Rc::clone(&log));
    let _a = store.subscribe_with_invalidate(
        move || a_change.borrow_mut().push("a:change"),
        move || a_invalidate.borrow_mut().push("a:invalidate"),
    );
    let (b_change, b_invalidate) = (Rc::clone(&log), Rc::clone(&log));
    let (handle, flag) = (store.clone(), Rc::clone(&armed));
    let _b = store.subscribe_with_invalidate(
        move || b_change.borrow_mut().push("b:change"),
        move || {
            b_invalidate.borrow_mut().push("b:invalidate");
            if flag.replace(false) {
                handle.set_caption("from invalidate");
            }
        },
    );
    log.borrow_mut().clear();

    armed.set(true);
    store.set_show_header(true);
    // The inner publish waits for the outer one; every change callback sees
    // both mutations and runs once.
    assert_eq!(
        *log.borrow(),
        [
            "a:invalidate",
            "b:invalidate",
            "a:invalidate",
            "b:invalidate",
            "a:change",
            "b:change"
        ]
    );
    assert_eq!(store.caption(), Some(Value::from("from invalidate")));
    assert!(!store.notifier().is_draining());
}

#[test]
fn subscriber_sees_post_mutation_state() {
    let store = store();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let (handle, s) = (store.clone(), Rc::clone(&seen));
    let _sub = store.subscribe(move || s.borrow_mut().push(handle.sort_direction()));

    store.set_sort("n", SortDirection::Ascending);
    store.toggle_sort("n");
    assert_eq!(
        *seen.borrow(),
        [
            SortDirection::None,
            SortDirection::Ascending,
            SortDirection::Descending
        ]
    );
}

#[test]
fn dropping_the_subscription_stops_delivery() {
    let store = store();
    let (count, on_change) = counter();
    let mut sub = store.subscribe(on_change);
    assert_eq!(store.subscriber_count(), 1);

    sub.unsubscribe();
    sub.unsubscribe();
    store.set_show_header(true);
    assert_eq!(count.get(), 1);
    assert_eq!(store.subscriber_count(), 0);

    let (count, on_change) = counter();
    {
        let _scoped = store.subscribe(on_change);
    }
    store.set_show_header(false);
    assert_eq!(count.get(), 1);
}

#[test]
fn subscriber_may_unsubscribe_another_mid_flush() {
    let store = store();
    let victim: Rc<RefCell<Option<tabula_runtime::Subscription>>> = Rc::new(RefCell::new(None));
    let v = Rc::clone(&victim);
    let _killer = store.subscribe(move || {
        if let Some(mut sub) = v.borrow_mut().take() {
            sub.unsubscribe();
        }
    });
    let (count, on_change) = counter();
    *victim.borrow_mut() = Some(store.subscribe(on_change));
    count.set(0);

    store.publish();
    assert_eq!(count.get(), 0);
    assert_eq!(store.subscriber_count(), 1);
}
