#![forbid(unsafe_code)]

//! Change notification for table stores.
//!
//! - [`Notifier`]: payload-free publish/subscribe with a FIFO delivery queue.
//! - [`Subscription`]: handle that unsubscribes on drop or on demand.
//! - [`BatchScope`]: RAII guard that defers delivery until the scope exits.
//!
//! # Architecture
//!
//! `Notifier` uses `Rc<RefCell<..>>` for single-threaded shared ownership.
//! No `RefCell` borrow is held while a callback runs, so callbacks may
//! subscribe, unsubscribe, or publish re-entrantly. Sharing a store across
//! threads requires external synchronization; the types are `!Send`.
//!
//! # Invariants
//!
//! 1. `subscribe` signals the new subscriber once before returning.
//! 2. A publish runs every invalidate callback before delivering any change
//!    callback.
//! 3. Change callbacks are delivered in queue order, which is registration
//!    order for a single publish.
//! 4. Only the outermost publish (or outermost [`BatchScope`]) drains; nested
//!    publishes, including those made from invalidate callbacks, only
//!    enqueue. Queued change callbacks never nest. The exception is the
//!    immediate signal of invariant 1: a subscriber registered from inside a
//!    callback is signalled synchronously, within that callback.
//! 5. A subscriber already waiting in the queue is not enqueued again, so it
//!    receives one signal per batch of mutations.
//! 6. Unsubscribing removes the callback and any pending delivery for it.

pub mod batch;
pub mod notifier;

pub use batch::BatchScope;
pub use notifier::{Callback, Notifier, StartHook, StopHook, Subscription};
