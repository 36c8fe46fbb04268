#![forbid(unsafe_code)]

//! Deferred delivery for groups of mutations.
//!
//! While a [`BatchScope`] is alive, publishes on its notifier still run
//! invalidate callbacks and enqueue subscribers, but nothing is delivered.
//! When the outermost scope drops, the queue drains once. Because a pending
//! subscriber is never enqueued twice, each subscriber sees exactly one
//! change signal for the whole batch.

use super::notifier::Notifier;

/// RAII guard that defers delivery until it drops.
///
/// Nested scopes flatten: only the outermost one flushes.
#[must_use = "dropping a BatchScope flushes immediately"]
pub struct BatchScope {
    notifier: Notifier,
}

impl BatchScope {
    /// Open a batch on `notifier`.
    pub fn new(notifier: &Notifier) -> Self {
        notifier.inner.borrow_mut().batch_depth += 1;
        Self {
            notifier: notifier.clone(),
        }
    }

    /// Whether this scope is the outermost open batch.
    #[must_use]
    pub fn is_outermost(&self) -> bool {
        self.notifier.inner.borrow().batch_depth == 1
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        let depth = {
            let Ok(mut inner) = self.notifier.inner.try_borrow_mut() else {
                return;
            };
            inner.batch_depth = inner.batch_depth.saturating_sub(1);
            inner.batch_depth
        };
        if depth == 0 && !std::thread::panicking() {
            self.notifier.flush();
        }
    }
}

impl std::fmt::Debug for BatchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScope")
            .field("outermost", &self.is_outermost())
            .finish()
    }
}
