use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Identifies one execution context of an [`Origin`](super::Origin).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub(crate) usize);

/// A change to the local storage area, as seen by other contexts.
///
/// `key` is `None` when the whole area was cleared. `new_value` is `None`
/// when the entry was removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

type Listener = Arc<dyn Fn(&StorageEvent) + Send + Sync>;

struct Subscriber {
    id: usize,
    context: ContextId,
    listener: Listener,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicUsize,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl BusInner {
    fn remove(&self, id: usize) {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|s| s.id != id);
    }
}

/// Broadcasts storage events between the contexts of one origin.
///
/// A published event reaches every subscriber except those registered by the
/// publishing context.
#[derive(Clone, Default)]
pub struct StorageEventBus {
    inner: Arc<BusInner>,
}

impl StorageEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` on behalf of `context`.
    pub fn subscribe<F>(&self, context: ContextId, listener: F) -> StorageListener
    where
        F: Fn(&StorageEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber {
                id,
                context,
                listener: Arc::new(listener),
            });

        StorageListener {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to the listeners of every context but `source`.
    ///
    /// Delivery is synchronous and in subscription order. Listeners run with
    /// no lock held and may publish in turn.
    pub fn publish(&self, source: ContextId, event: &StorageEvent) {
        let listeners: Vec<Listener> = self
            .inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.context != source)
            .map(|s| Arc::clone(&s.listener))
            .collect();

        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Disposer for a storage event subscription.
///
/// Dropping it unsubscribes; [`StorageListener::dispose`] does the same
/// explicitly.
pub struct StorageListener {
    id: usize,
    bus: Weak<BusInner>,
}

impl StorageListener {
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for StorageListener {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
        }
    }
}
