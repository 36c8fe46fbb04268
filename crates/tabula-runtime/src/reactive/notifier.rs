#![forbid(unsafe_code)]

//! Change notifier with a re-entrancy-safe delivery queue.
//!
//! A [`Notifier`] carries no payload. Subscribers are told "something
//! changed" and re-read whatever they need.
//!
//! # Publish cycle
//!
//! 1. Every registered subscriber's invalidate callback runs (if any).
//! 2. Each subscriber is enqueued for delivery unless it is already pending.
//! 3. If no drain is in flight, no outer publish is still in steps 1-2 and no
//!    [`BatchScope`](super::BatchScope) is open, the queue is drained in FIFO
//!    order until empty.
//!
//! A publish triggered from inside a change callback lands in the same queue
//! and is flushed by the drain loop already running; it never starts a second
//! loop. One triggered from an invalidate callback enqueues and leaves the
//! drain to the publish that called it.
//!
//! A subscriber registered from inside a callback is signalled synchronously
//! before `subscribe` returns, so that one signal nests in the caller.
//!
//! # Failure Modes
//!
//! - Callback panic: propagates to the caller of `publish()`. Drop guards
//!   clear the in-flight state and pending queue during unwinding, so later
//!   publishes deliver normally.
//! - Double unsubscribe: no-op.
//! - Notifier dropped while a [`Subscription`] is alive: unsubscribe is a
//!   no-op (the subscription only holds a `Weak`).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

/// Callback invoked on change or invalidation.
pub type Callback = Rc<dyn Fn()>;

/// Hook run when the last subscriber leaves.
pub type StopHook = Box<dyn FnOnce()>;

/// Hook run when the first subscriber arrives; returns the matching stop hook.
pub type StartHook = Rc<dyn Fn() -> StopHook>;

struct Subscriber {
    id: u64,
    on_change: Callback,
    on_invalidate: Option<Callback>,
}

pub(super) struct NotifierInner {
    subscribers: Vec<Subscriber>,
    queue: VecDeque<(u64, Callback)>,
    draining: bool,
    /// Publishes currently running their invalidate/enqueue phase.
    publishing: usize,
    pub(super) batch_depth: usize,
    next_id: u64,
    start: Option<StartHook>,
    stop: Option<StopHook>,
}

impl NotifierInner {
    fn is_pending(&self, id: u64) -> bool {
        self.queue.iter().any(|(queued, _)| *queued == id)
    }
}

/// Shared change notifier.
///
/// Cloning yields another handle to the same subscriber set.
#[derive(Clone)]
pub struct Notifier {
    pub(super) inner: Rc<RefCell<NotifierInner>>,
}

impl Notifier {
    /// A notifier with no lifecycle hooks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(NotifierInner {
                subscribers: Vec::new(),
                queue: VecDeque::new(),
                draining: false,
                publishing: 0,
                batch_depth: 0,
                next_id: 0,
                start: None,
                stop: None,
            })),
        }
    }

    /// A notifier that runs `start` when the first subscriber arrives.
    ///
    /// The hook returned by `start` runs once when the last subscriber leaves.
    /// The pair runs again on the next idle-to-observed transition.
    #[must_use]
    pub fn with_start(start: impl Fn() -> StopHook + 'static) -> Self {
        let notifier = Self::new();
        notifier.inner.borrow_mut().start = Some(Rc::new(start));
        notifier
    }

    /// Register `on_change`, signal it once immediately, and return its handle.
    pub fn subscribe(&self, on_change: impl Fn() + 'static) -> Subscription {
        self.register(Rc::new(on_change), None)
    }

    /// Like [`subscribe`](Self::subscribe), with a callback that runs at the
    /// start of every publish, before any change callback is delivered.
    pub fn subscribe_with_invalidate(
        &self,
        on_change: impl Fn() + 'static,
        on_invalidate: impl Fn() + 'static,
    ) -> Subscription {
        self.register(Rc::new(on_change), Some(Rc::new(on_invalidate)))
    }

    fn register(&self, on_change: Callback, on_invalidate: Option<Callback>) -> Subscription {
        let (id, start) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push(Subscriber {
                id,
                on_change: Rc::clone(&on_change),
                on_invalidate,
            });
            let first = inner.subscribers.len() == 1;
            (id, if first { inner.start.clone() } else { None })
        };
        trace!(subscriber = id, "subscribe");

        if let Some(start) = start {
            let stop = start();
            self.inner.borrow_mut().stop = Some(stop);
        }

        // The first signal runs as part of a drain so publishes it triggers
        // are queued behind it instead of nesting.
        let nested = self.inner.borrow().draining;
        if nested {
            on_change();
        } else {
            self.inner.borrow_mut().draining = true;
            {
                let _guard = DrainGuard { inner: &self.inner };
                on_change();
            }
            self.flush();
        }

        Subscription {
            notifier: Rc::downgrade(&self.inner),
            id,
            active: true,
        }
    }

    /// Notify every current subscriber that state changed.
    ///
    /// A publish started from an invalidate callback only enqueues; the
    /// outermost publish drains once its own invalidate phase is complete.
    pub fn publish(&self) {
        let targets: Vec<(u64, Option<Callback>)> = {
            let mut inner = self.inner.borrow_mut();
            inner.publishing += 1;
            inner
                .subscribers
                .iter()
                .map(|s| (s.id, s.on_invalidate.clone()))
                .collect()
        };
        trace!(subscribers = targets.len(), "publish");

        let guard = PublishGuard { inner: &self.inner };
        for (id, on_invalidate) in targets {
            if let Some(invalidate) = on_invalidate {
                invalidate();
            }
            let mut inner = self.inner.borrow_mut();
            if inner.is_pending(id) {
                continue;
            }
            // The invalidate callback may have unsubscribed.
            let on_change = inner
                .subscribers
                .iter()
                .find(|s| s.id == id)
                .map(|s| Rc::clone(&s.on_change));
            if let Some(on_change) = on_change {
                inner.queue.push_back((id, on_change));
            }
        }
        drop(guard);

        self.flush();
    }

    /// Drain the queue unless a drain, publish or batch is already in progress.
    pub(super) fn flush(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            trace!(
                pending = inner.queue.len(),
                draining = inner.draining,
                publishing = inner.publishing,
                batch_depth = inner.batch_depth,
                "flush"
            );
            if inner.draining || inner.publishing > 0 || inner.batch_depth > 0 {
                return;
            }
            inner.draining = true;
        }
        let _guard = DrainGuard { inner: &self.inner };

        loop {
            let next = self.inner.borrow_mut().queue.pop_front();
            let Some((_, on_change)) = next else {
                break;
            };
            on_change();
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Whether a drain loop is currently delivering callbacks.
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.inner.borrow().draining
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Notifier")
            .field("subscribers", &inner.subscribers.len())
            .field("pending", &inner.queue.len())
            .field("draining", &inner.draining)
            .field("publishing", &inner.publishing)
            .finish()
    }
}

/// Resets the drain state when a delivery exits. Pending deliveries are
/// discarded only when unwinding out of a panicking callback.
struct DrainGuard<'a> {
    inner: &'a Rc<RefCell<NotifierInner>>,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.draining = false;
            if std::thread::panicking() {
                inner.queue.clear();
            }
        }
    }
}

/// Leaves the invalidate phase of a publish, including by unwinding.
struct PublishGuard<'a> {
    inner: &'a Rc<RefCell<NotifierInner>>,
}

impl Drop for PublishGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut() {
            inner.publishing = inner.publishing.saturating_sub(1);
            if std::thread::panicking() && inner.publishing == 0 && !inner.draining {
                inner.queue.clear();
            }
        }
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping it unsubscribes. [`unsubscribe`](Self::unsubscribe) does the same
/// eagerly; calling it twice is harmless.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    notifier: Weak<RefCell<NotifierInner>>,
    id: u64,
    active: bool,
}

impl Subscription {
    /// Remove the subscriber. Pending deliveries for it are discarded.
    pub fn unsubscribe(&mut self) {
        if !std::mem::replace(&mut self.active, false) {
            return;
        }
        let Some(inner) = self.notifier.upgrade() else {
            return;
        };
        let stop = {
            let mut inner = inner.borrow_mut();
            let id = self.id;
            inner.subscribers.retain(|s| s.id != id);
            inner.queue.retain(|(queued, _)| *queued != id);
            if inner.subscribers.is_empty() {
                inner.stop.take()
            } else {
                None
            }
        };
        trace!(subscriber = self.id, "unsubscribe");
        if let Some(stop) = stop {
            stop();
        }
    }

    /// Whether this handle still has a registered subscriber.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active && self.notifier.strong_count() > 0
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
