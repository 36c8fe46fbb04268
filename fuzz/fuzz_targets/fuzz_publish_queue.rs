#![no_main]

//! Arbitrary interleavings of subscribe, unsubscribe, publish, batching and
//! re-entrant publishes against a `Notifier`. Checks that no callback nests
//! inside another, that every flush fully drains, and that each live
//! subscriber hears about a top-level publish at least once.

use std::cell::Cell;
use std::rc::Rc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tabula_runtime::{BatchScope, Notifier, Subscription};

#[derive(Debug, Arbitrary)]
enum Op {
    Subscribe { reentrant: bool },
    Unsubscribe(u8),
    Publish,
    Batch(u8),
}

struct Tracked {
    calls: Rc<Cell<u32>>,
    sub: Subscription,
}

fuzz_target!(|ops: Vec<Op>| {
    let notifier = Notifier::new();
    let depth = Rc::new(Cell::new(0u32));
    let mut tracked: Vec<Tracked> = Vec::new();

    for op in ops.into_iter().take(128) {
        match op {
            Op::Subscribe { reentrant } => {
                let calls = Rc::new(Cell::new(0u32));
                let (c, d, n) = (Rc::clone(&calls), Rc::clone(&depth), notifier.clone());
                let armed = Cell::new(reentrant);
                let sub = notifier.subscribe(move || {
                    d.set(d.get() + 1);
                    assert_eq!(d.get(), 1, "callbacks must not nest");
                    c.set(c.get() + 1);
                    if armed.replace(false) {
                        n.publish();
                    }
                    d.set(d.get() - 1);
                });
                // A re-entrant first signal queues one more delivery behind itself.
                let expected = if reentrant { 2 } else { 1 };
                assert_eq!(calls.get(), expected, "subscribe must signal immediately");
                tracked.push(Tracked { calls, sub });
            }
            Op::Unsubscribe(idx) => {
                if !tracked.is_empty() {
                    let idx = idx as usize % tracked.len();
                    tracked[idx].sub.unsubscribe();
                }
            }
            Op::Publish => {
                let before: Vec<u32> = tracked.iter().map(|p| p.calls.get()).collect();
                notifier.publish();
                for (entry, before) in tracked.iter().zip(before) {
                    if entry.sub.is_active() {
                        assert!(entry.calls.get() > before, "live subscriber missed a publish");
                    } else {
                        assert_eq!(entry.calls.get(), before);
                    }
                }
            }
            Op::Batch(publishes) => {
                let before: Vec<u32> = tracked.iter().map(|p| p.calls.get()).collect();
                {
                    let _scope = BatchScope::new(&notifier);
                    for _ in 0..publishes % 8 {
                        notifier.publish();
                    }
                    for (entry, before) in tracked.iter().zip(&before) {
                        assert_eq!(entry.calls.get(), *before, "batch delivered early");
                    }
                }
                if publishes % 8 > 0 {
                    for (entry, before) in tracked.iter().zip(before) {
                        if entry.sub.is_active() {
                            assert!(entry.calls.get() > before);
                        }
                    }
                }
            }
        }
        assert!(!notifier.is_draining());
        assert_eq!(depth.get(), 0);
        let live = tracked.iter().filter(|p| p.sub.is_active()).count();
        assert_eq!(notifier.subscriber_count(), live);
    }
});
