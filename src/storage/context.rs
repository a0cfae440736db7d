use super::events::{ContextId, StorageEvent, StorageEventBus, StorageListener};
use super::{MemoryStorage, StorageBackend, StorageType};
use crate::error::StorageError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A set of contexts sharing one local storage area and one event bus.
pub struct Origin {
    local: Arc<dyn StorageBackend>,
    bus: StorageEventBus,
    next_context: AtomicUsize,
}

impl Origin {
    /// Origin backed by an in-memory local area.
    pub fn new() -> Self {
        Self::with_local(MemoryStorage::new())
    }

    /// Origin whose local area is `backend`, e.g. a [`FileStorage`](super::FileStorage).
    pub fn with_local(backend: impl StorageBackend + 'static) -> Self {
        Self {
            local: Arc::new(backend),
            bus: StorageEventBus::new(),
            next_context: AtomicUsize::new(0),
        }
    }

    /// Open a new execution context with a fresh session area.
    pub fn open_context(&self) -> StorageContext {
        let id = ContextId(self.next_context.fetch_add(1, Ordering::SeqCst));
        StorageContext {
            id,
            local: Arc::new(NotifyingStorage {
                inner: Arc::clone(&self.local),
                bus: self.bus.clone(),
                source: id,
            }),
            session: Arc::new(MemoryStorage::new()),
            bus: self.bus.clone(),
        }
    }

    /// The local area without event publishing.
    pub fn local_storage(&self) -> Arc<dyn StorageBackend> {
        Arc::clone(&self.local)
    }

    pub fn bus(&self) -> &StorageEventBus {
        &self.bus
    }
}

impl Default for Origin {
    fn default() -> Self {
        Self::new()
    }
}

/// One execution context: the storage areas it sees and the events it hears.
#[derive(Clone)]
pub struct StorageContext {
    id: ContextId,
    local: Arc<dyn StorageBackend>,
    session: Arc<dyn StorageBackend>,
    bus: StorageEventBus,
}

impl StorageContext {
    /// A context on a private in-memory origin.
    pub fn standalone() -> Self {
        Origin::new().open_context()
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn storage(&self, storage_type: StorageType) -> Arc<dyn StorageBackend> {
        match storage_type {
            StorageType::Local => Arc::clone(&self.local),
            StorageType::Session => Arc::clone(&self.session),
        }
    }

    pub fn local_storage(&self) -> Arc<dyn StorageBackend> {
        self.storage(StorageType::Local)
    }

    pub fn session_storage(&self) -> Arc<dyn StorageBackend> {
        self.storage(StorageType::Session)
    }

    /// Listen for local-area changes made by other contexts.
    pub fn subscribe<F>(&self, listener: F) -> StorageListener
    where
        F: Fn(&StorageEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(self.id, listener)
    }
}

/// Local-area view of one context. Publishes an event for every write that
/// actually changes the area.
struct NotifyingStorage {
    inner: Arc<dyn StorageBackend>,
    bus: StorageEventBus,
    source: ContextId,
}

impl StorageBackend for NotifyingStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let old_value = self.inner.get_item(key)?;
        if old_value.as_deref() == Some(value) {
            return Ok(());
        }
        self.inner.set_item(key, value)?;
        self.bus.publish(
            self.source,
            &StorageEvent {
                key: Some(key.to_owned()),
                old_value,
                new_value: Some(value.to_owned()),
            },
        );
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let Some(old_value) = self.inner.get_item(key)? else {
            return Ok(());
        };
        self.inner.remove_item(key)?;
        self.bus.publish(
            self.source,
            &StorageEvent {
                key: Some(key.to_owned()),
                old_value: Some(old_value),
                new_value: None,
            },
        );
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        if self.inner.is_empty() {
            return Ok(());
        }
        self.inner.clear()?;
        self.bus.publish(
            self.source,
            &StorageEvent {
                key: None,
                old_value: None,
                new_value: None,
            },
        );
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}
