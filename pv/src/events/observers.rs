//! Synchronous observer registry
//!
//! Components own an [`Observers`] and call [`Observers::notify`] on each
//! change. Callbacks run on the notifying thread, in subscription order.

use std::sync::{Arc, Mutex, Weak};

use tracing::debug;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    callbacks: Vec<(u64, Callback<T>)>,
}

/// Callback list with explicit unsubscribe handles
pub struct Observers<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Observers<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                callbacks: Vec::new(),
            })),
        }
    }

    /// Register a callback; it stays registered until the handle is used
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
        T: 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.callbacks.push((id, Arc::new(callback)));
        debug!(id, subscribers = registry.callbacks.len(), "Observers::subscribe: called");

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    lock(&registry).callbacks.retain(|(cid, _)| *cid != id);
                }
            })),
        }
    }

    /// Call every subscriber with `value`
    ///
    /// The list is snapshotted first, so callbacks may subscribe or unsubscribe.
    pub fn notify(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = lock(&self.registry).callbacks.iter().map(|(_, cb)| cb.clone()).collect();
        debug!(subscribers = callbacks.len(), "Observers::notify: called");
        for callback in callbacks {
            callback(value);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).callbacks.len()
    }
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(registry: &Mutex<Registry<T>>) -> std::sync::MutexGuard<'_, Registry<T>> {
    // A panicking callback must not take the registry down with it
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle returned by [`Observers::subscribe`]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Stop receiving notifications
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            debug!("Subscription::unsubscribe: called");
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("active", &self.remove.is_some()).finish()
    }
}
