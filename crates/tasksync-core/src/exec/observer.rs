//! Invocation lifecycle observers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Observes the invocation lifecycle of one account.
pub trait InvocationObserver: Send + Sync {
    /// An invocation is about to spawn the external executable.
    fn on_start(&self);
    /// The invocation and both of its stream readers have completed.
    fn on_finish(&self);
}

/// Ordered fan-out list of invocation observers.
///
/// Registering while an invocation is active immediately fires `on_start`
/// for the new observer, so every observer sees a start before any finish.
#[derive(Default)]
pub struct ObserverSet {
    observers: Mutex<Vec<Arc<dyn InvocationObserver>>>,
    active: AtomicBool,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer, with late-subscriber catch-up.
    pub fn add(&self, observer: Arc<dyn InvocationObserver>) {
        if self.active.load(Ordering::SeqCst) {
            observer.on_start();
        }
        self.observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(observer);
    }

    /// True while an invocation is in flight.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Mark the account active and notify all observers of the start.
    pub(crate) fn begin(&self) {
        self.active.store(true, Ordering::SeqCst);
        for observer in self.snapshot() {
            observer.on_start();
        }
    }

    /// Notify all observers of the finish, then mark the account idle.
    pub(crate) fn finish(&self) {
        for observer in self.snapshot() {
            observer.on_finish();
        }
        self.active.store(false, Ordering::SeqCst);
    }

    fn snapshot(&self) -> Vec<Arc<dyn InvocationObserver>> {
        self.observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
