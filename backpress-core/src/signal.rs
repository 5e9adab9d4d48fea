//! Observable boolean shared between a handler and the manager.
//!
//! Observers are invoked synchronously, in subscription order, and only when
//! the value actually changes. The internal lock is released before any
//! observer runs, so an observer may read the signal, (un)subscribe or set it
//! again. A nested `set` supersedes the outer one: observers not yet reached
//! by the outer notification only hear the newer value.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

type Observer = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct SignalState {
    value: bool,
    /// Bumped on every change.
    version: u64,
    next_id: u64,
    observers: SmallVec<[(SubscriptionId, Observer); 2]>,
}

/// Cloning yields another handle to the same underlying value.
#[derive(Clone)]
pub struct BackPressSignal {
    inner: Arc<Mutex<SignalState>>,
}

impl BackPressSignal {
    pub fn new(initial: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SignalState {
                value: initial,
                version: 0,
                next_id: 0,
                observers: SmallVec::new(),
            })),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.inner.lock().value
    }

    /// Update the value, notifying observers if it changed.
    pub fn set(&self, value: bool) {
        let (version, observers): (u64, SmallVec<[Observer; 2]>) = {
            let mut state = self.inner.lock();
            if state.value == value {
                return;
            }
            state.value = value;
            state.version += 1;
            let observers = state.observers.iter().map(|(_, o)| Arc::clone(o)).collect();
            (state.version, observers)
        };

        for observer in observers {
            if self.inner.lock().version != version {
                break;
            }
            observer(value);
        }
    }

    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let mut state = self.inner.lock();
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        state.observers.push((id, Arc::new(observer)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.inner.lock();
        let before = state.observers.len();
        state.observers.retain(|(existing, _)| *existing != id);
        state.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.inner.lock().observers.len()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for BackPressSignal {
    fn default() -> Self {
        Self::new(false)
    }
}

impl fmt::Debug for BackPressSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("BackPressSignal")
            .field("value", &state.value)
            .field("observers", &state.observers.len())
            .finish()
    }
}
