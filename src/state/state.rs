use super::codec;
use super::options::StateOptions;
use crate::signal::{ReadSignal, Signal, WatchGuard, WatchOptions, WriteSignal};
use crate::storage::{StorageBackend, StorageContext, StorageEvent, StorageListener};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Subscriptions a cell owns, shared by the cell and its setter.
struct Bindings {
    key: String,
    write_back: Mutex<Option<WatchGuard>>,
    sync: Mutex<Option<StorageListener>>,
}

fn locked<G>(slot: &Mutex<G>) -> MutexGuard<'_, G> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a value as coming from another context while it is applied. The
/// write-back watcher consumes the mark on its first call, so only the remote
/// value itself is skipped; anything a watcher sets in response is stored.
/// This holds because `create_state` registers the write-back watcher before
/// any caller can watch the signal.
struct RemoteApply<'a>(&'a AtomicBool);

impl<'a> RemoteApply<'a> {
    fn begin(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RemoteApply<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A reactive value, optionally persisted to a storage area and kept in step
/// with other contexts.
///
/// Persistence and sync stay active until [`StateCell::dispose`] is called or
/// the cell and every [`Setter`] for it are dropped.
pub struct StateCell<T> {
    signal: Signal<T>,
    bindings: Arc<Bindings>,
}

impl<T> Clone for StateCell<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
            bindings: Arc::clone(&self.bindings),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> StateCell<T> {
    pub fn get(&self) -> T {
        self.signal.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.signal.with(f)
    }

    /// Mutate the value in place. Persisted only with `deep_watch` on a
    /// non-shallow cell.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.signal.update(f);
    }

    /// Notify watchers as if the value had been replaced. Persists a shallow
    /// cell after [`StateCell::update`].
    pub fn trigger(&self) {
        self.signal.trigger();
    }

    pub fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.signal.watch(callback)
    }

    pub fn watch_with<F>(&self, options: WatchOptions, callback: F) -> WatchGuard
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.signal.watch_with(options, callback)
    }

    pub fn signal(&self) -> ReadSignal<T> {
        self.signal.read_only()
    }

    pub fn storage_key(&self) -> &str {
        &self.bindings.key
    }

    /// Whether changes are still written to storage.
    pub fn is_persistent(&self) -> bool {
        locked(&self.bindings.write_back).is_some()
    }

    /// Whether changes from other contexts are still applied.
    pub fn is_synced(&self) -> bool {
        locked(&self.bindings.sync).is_some()
    }

    /// Stop writing to storage and stop listening to other contexts.
    ///
    /// The in-memory value keeps working. Affects every clone of this cell.
    pub fn dispose(&self) {
        let write_back = locked(&self.bindings.write_back).take();
        let sync = locked(&self.bindings.sync).take();
        drop((write_back, sync));
        debug!(key = %self.bindings.key, "state cell disposed");
    }
}

/// Replaces the value of a [`StateCell`].
pub struct Setter<T> {
    signal: WriteSignal<T>,
    _bindings: Arc<Bindings>,
}

impl<T> Clone for Setter<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
            _bindings: Arc::clone(&self._bindings),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Setter<T> {
    /// Replace the value. Storage is written by the cell's watcher, not here.
    pub fn set(&self, value: T) {
        self.signal.set(value);
    }
}

/// Create a state cell in `context`.
///
/// The starting value is the decoded entry at `options.storage_key` when
/// persistence is enabled and the entry is present and valid, and `initial`
/// otherwise. Storage problems never surface as errors: they are logged with
/// `tracing` and the in-memory value carries on.
///
/// # Example
///
/// ```
/// use statecell::{create_state, StateOptions, StorageContext};
///
/// let context = StorageContext::standalone();
/// let (count, set_count) = create_state(&context, 0, StateOptions::new().persisted("counter"));
/// set_count.set(5);
/// assert_eq!(count.get(), 5);
///
/// let (again, _) = create_state(&context, 0, StateOptions::new().persisted("counter"));
/// assert_eq!(again.get(), 5);
/// ```
pub fn create_state<T>(context: &StorageContext, initial: T, options: StateOptions) -> (StateCell<T>, Setter<T>)
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let key = options.storage_key.clone();
    let persist = options.persistence_enabled();
    let storage = context.storage(options.storage_type);

    let value = if persist {
        match codec::load(&*storage, &key) {
            Ok(Some(stored)) => {
                debug!(key = %key, "loaded state from storage");
                stored
            }
            Ok(None) => initial,
            Err(err) => {
                warn!(key = %key, error = %err, "discarding stored state, using initial value");
                initial
            }
        }
    } else {
        initial
    };

    let signal = Signal::with_tracking(value, options.tracking());
    let applying_remote = Arc::new(AtomicBool::new(false));

    let write_back = persist.then(|| {
        bind_write_back(
            &signal,
            storage,
            key.clone(),
            options.deep_watch,
            Arc::clone(&applying_remote),
        )
    });

    let sync = if options.sync_enabled() {
        Some(bind_sync(context, &signal, key.clone(), applying_remote))
    } else {
        if persist && options.sync_tabs {
            debug!(key = %key, "sync requested for session storage, ignoring");
        }
        None
    };

    let bindings = Arc::new(Bindings {
        key,
        write_back: Mutex::new(write_back),
        sync: Mutex::new(sync),
    });

    let setter = Setter {
        signal: signal.write_only(),
        _bindings: Arc::clone(&bindings),
    };
    (StateCell { signal, bindings }, setter)
}

fn bind_write_back<T>(
    signal: &Signal<T>,
    storage: Arc<dyn StorageBackend>,
    key: String,
    deep: bool,
    applying_remote: Arc<AtomicBool>,
) -> WatchGuard
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    let options = WatchOptions {
        deep,
        immediate: false,
    };
    signal.watch_with(options, move |value: &T| {
        if applying_remote.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Err(err) = codec::store(&*storage, &key, value) {
            warn!(key = %key, error = %err, "failed to persist state");
        }
    })
}

fn bind_sync<T>(
    context: &StorageContext,
    signal: &Signal<T>,
    key: String,
    applying_remote: Arc<AtomicBool>,
) -> StorageListener
where
    T: Clone + DeserializeOwned + Send + Sync + 'static,
{
    let signal = signal.clone();
    context.subscribe(move |event: &StorageEvent| {
        if event.key.as_deref() != Some(key.as_str()) {
            return;
        }
        let Some(text) = event.new_value.as_deref().filter(|text| !text.is_empty()) else {
            return;
        };
        match codec::decode::<T>(&key, text) {
            Ok(value) => {
                let _remote = RemoteApply::begin(&applying_remote);
                signal.set(value);
            }
            Err(err) => warn!(key = %key, error = %err, "sync failed, keeping current value"),
        }
    })
}

impl StorageContext {
    /// Method form of [`create_state`].
    pub fn create_state<T>(&self, initial: T, options: StateOptions) -> (StateCell<T>, Setter<T>)
    where
        T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        create_state(self, initial, options)
    }
}
