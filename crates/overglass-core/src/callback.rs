//! Typed change-notification registry shared by the tracking subsystems.
//!
//! Callbacks are registered against a concrete event type and invoked
//! synchronously on whichever thread detected the change. Emission walks
//! a copy of the entry list, never the list under its own lock, so a
//! callback may register or unregister callbacks without deadlocking.
//! A panicking callback is caught, logged, and does not stop siblings.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::log_error;

type Handler<E> = Arc<Mutex<dyn FnMut(&E) + Send>>;

struct Entry<E> {
    id: u64,
    handler: Handler<E>,
}

impl<E> Clone for Entry<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Arc::clone(&self.handler),
        }
    }
}

/// A set of registered callbacks for one event type.
pub struct CallbackSet<E> {
    entries: Mutex<Vec<Entry<E>>>,
    next_id: AtomicU64,
}

impl<E> Default for CallbackSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> CallbackSet<E> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a callback and returns its id for later removal.
    pub fn register<F>(&self, handler: F) -> u64
    where
        F: FnMut(&E) + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = Entry {
            id,
            handler: Arc::new(Mutex::new(handler)),
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
        id
    }

    /// Unregisters a callback by id. Returns whether it was found.
    pub fn unregister(&self, id: u64) -> bool {
        let Ok(mut entries) = self.entries.lock() else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() != before
    }

    /// Returns the number of registered callbacks.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes every registered callback with the event.
    ///
    /// The entry list is copied before invocation, so handlers run
    /// outside the list lock.
    pub fn emit(&self, event: &E) {
        let copied: Vec<Entry<E>> = match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(_) => return,
        };

        for entry in copied {
            let Ok(mut handler) = entry.handler.lock() else {
                continue;
            };
            let result = catch_unwind(AssertUnwindSafe(|| (*handler)(event)));
            if result.is_err() {
                log_error!("callback {} panicked during dispatch", entry.id);
            }
        }
    }
}
