/*!
 * Typed event fan-out with structured unsubscribe handles.
 *
 * Consumers subscribe with a callback and get back a `Subscription` that
 * detaches the callback when dropped or explicitly unsubscribed. Emission
 * hands each listener a shared reference to the event; listeners copy what
 * they need, so a later replace of the producer's state never affects them.
 *
 * A panicking listener is isolated from the others: the panic is caught and
 * logged, matching the contract that nothing in the caption core propagates
 * an error into the host.
 */

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use log::error;
use parking_lot::Mutex;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    listeners: Vec<(u64, Callback<T>)>,
    next_id: u64,
}

/// Multi-subscriber event emitter
pub struct EventEmitter<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

/// Handle detaching one listener; unsubscribes on drop
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl<T> EventEmitter<T> {
    pub fn new() -> Self {
        EventEmitter {
            registry: Arc::new(Mutex::new(Registry {
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Register a listener and return its subscription handle
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
        T: 'static,
    {
        let id = {
            let mut reg = self.registry.lock();
            let id = reg.next_id;
            reg.next_id += 1;
            reg.listeners.push((id, Arc::new(listener)));
            id
        };

        let registry = Arc::downgrade(&self.registry);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.lock().listeners.retain(|(lid, _)| *lid != id);
                }
            })),
        }
    }

    /// Deliver an event to every current listener
    pub fn emit(&self, event: &T) {
        // Snapshot under the lock, invoke outside it: a listener may
        // subscribe or unsubscribe reentrantly
        let listeners: Vec<Callback<T>> = self
            .registry
            .lock()
            .listeners
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!("caption event listener panicked; continuing with remaining listeners");
            }
        }
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.registry.lock().listeners.len()
    }

    /// Drop every registered listener
    pub fn clear(&self) {
        self.registry.lock().listeners.clear();
    }
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscription {
    /// Detach the listener now instead of at drop time
    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }

    /// Keep the listener attached for the emitter's whole lifetime
    pub fn forever(mut self) {
        self.detach = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}
