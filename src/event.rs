//! Subscriber fan-out for manager and controller events.
//!
//! Events are delivered synchronously to an ordered list of subscriber
//! callbacks. A misbehaving subscriber is isolated so the remaining
//! subscribers still get notified.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use tracing::warn;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle identifying a registered subscriber.
///
/// Pass it back to the owning emitter's `unsubscribe` to stop delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

/// Ordered list of subscriber callbacks for one event kind.
pub(crate) struct EventEmitter<T> {
    inner: Mutex<EmitterInner<T>>,
}

struct EmitterInner<T> {
    next_id: u64,
    subscribers: Vec<(u64, Callback<T>)>,
}

impl<T> EventEmitter<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(EmitterInner {
                next_id: 0,
                subscribers: Vec::new(),
            }),
        }
    }

    pub(crate) fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, Arc::new(callback)));
        Subscription(id)
    }

    /// Remove a subscriber. Unknown handles are ignored.
    pub(crate) fn unsubscribe(&self, subscription: Subscription) {
        let mut inner = self.inner.lock().unwrap();
        inner.subscribers.retain(|(id, _)| *id != subscription.0);
    }

    /// Notify all subscribers in registration order.
    ///
    /// A panicking subscriber is caught and logged; delivery continues
    /// with the remaining subscribers. The list is snapshotted before
    /// invocation so callbacks may re-enter the emitter.
    pub(crate) fn emit(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = {
            let inner = self.inner.lock().unwrap();
            inner.subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for callback in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
                warn!("event subscriber panicked, continuing with remaining subscribers");
            }
        }
    }
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}
