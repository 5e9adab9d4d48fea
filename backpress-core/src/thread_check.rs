//! UI-thread affinity check.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

use tracing::warn;

#[derive(Debug)]
pub struct ThreadChecker {
    owner: ThreadId,
    disabled: AtomicBool,
}

impl ThreadChecker {
    /// Binds to the calling thread.
    pub fn new() -> Self {
        Self {
            owner: thread::current().id(),
            disabled: AtomicBool::new(false),
        }
    }

    pub fn is_on_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Panics in debug builds when called off the owning thread.
    #[track_caller]
    pub fn assert_on_owner_thread(&self, operation: &'static str) {
        if self.disabled.load(Ordering::Relaxed) || self.is_on_owner_thread() {
            return;
        }

        warn!(
            marker = "WRONG_THREAD",
            operation,
            owner = ?self.owner,
            current = ?thread::current().id(),
            "back-press manager used off its owning thread"
        );
        debug_assert!(false, "{operation} must run on the owning UI thread");
    }

    /// Testing only: allow use from any thread.
    pub fn set_disabled_for_testing(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Relaxed);
    }
}

impl Default for ThreadChecker {
    fn default() -> Self {
        Self::new()
    }
}
