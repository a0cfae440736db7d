use crate::runtime::{ChangeKind, ReactiveRuntime, RuntimeInner};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, Weak};

/// How much of a signal's value is tracked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Tracking {
    /// Only top-level replacement notifies watchers.
    Shallow,
    /// In-place mutation through [`Signal::update`] notifies deep watchers too.
    #[default]
    Deep,
}

/// Options for [`Signal::watch_with`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Also fire on in-place mutation of a deeply tracked signal.
    pub deep: bool,
    /// Fire once with the current value right away.
    pub immediate: bool,
}

impl WatchOptions {
    pub fn deep() -> Self {
        Self {
            deep: true,
            immediate: false,
        }
    }
}

/// A reactive signal that holds a value and notifies watchers when changed.
#[derive(Clone)]
pub struct Signal<T> {
    value: Arc<RwLock<T>>,
    id: usize,
    tracking: Tracking,
    runtime: Arc<ReactiveRuntime>,
}

impl<T: Clone + Send + Sync + 'static> Signal<T> {
    /// Create a new deeply tracked signal with the given initial value.
    pub fn new(initial: T) -> Self {
        Self::with_tracking(initial, Tracking::Deep)
    }

    /// Create a signal that only tracks top-level replacement.
    pub fn shallow(initial: T) -> Self {
        Self::with_tracking(initial, Tracking::Shallow)
    }

    pub fn with_tracking(initial: T, tracking: Tracking) -> Self {
        let runtime = ReactiveRuntime::current();
        let id = runtime.next_id();

        Self {
            value: Arc::new(RwLock::new(initial)),
            id,
            tracking,
            runtime,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, T> {
        self.value.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the current value of the signal.
    pub fn get(&self) -> T {
        self.read().clone()
    }

    /// Set a new value for the signal.
    ///
    /// Watchers are notified before this returns, even if the new value
    /// equals the old one.
    pub fn set(&self, new_value: T) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = new_value;
        self.runtime.notify_watchers(self.id, ChangeKind::Replaced);
    }

    /// Mutate the value in place.
    ///
    /// Deep watchers of a deeply tracked signal are notified. A shallow
    /// signal notifies nobody; call [`Signal::trigger`] afterwards if the
    /// change should be observed.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.value.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut *value);
        drop(value); // Release the write lock before notifying
        if self.tracking == Tracking::Deep {
            self.runtime.notify_watchers(self.id, ChangeKind::Mutated);
        }
    }

    /// Notify watchers as if the value had been replaced.
    pub fn trigger(&self) {
        self.runtime.notify_watchers(self.id, ChangeKind::Replaced);
    }

    /// Read the value with a function without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.read())
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn tracking(&self) -> Tracking {
        self.tracking
    }

    /// Watch this signal for top-level replacement.
    pub fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.watch_with(WatchOptions::default(), callback)
    }

    /// Watch this signal with explicit options.
    ///
    /// The callback receives a snapshot of the value taken after the change.
    /// Dropping the returned guard unsubscribes.
    pub fn watch_with<F>(&self, options: WatchOptions, callback: F) -> WatchGuard
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let observer_id = self.runtime.next_id();
        let value = Arc::clone(&self.value);
        let callback = Arc::new(callback);
        let callback_clone = Arc::clone(&callback);

        self.runtime
            .register_watcher(self.id, observer_id, options.deep, move || {
                let snapshot = value.read().unwrap_or_else(PoisonError::into_inner).clone();
                callback_clone(&snapshot);
            });

        if options.immediate {
            callback(&self.get());
        }

        WatchGuard {
            observer_id,
            runtime: Arc::downgrade(&self.runtime.inner()),
        }
    }

    /// Number of live watchers on this signal.
    pub fn watcher_count(&self) -> usize {
        self.runtime.watcher_count(self.id)
    }

    /// Read-only view of this signal.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            signal: self.clone(),
        }
    }

    /// Write-only view of this signal.
    pub fn write_only(&self) -> WriteSignal<T> {
        WriteSignal {
            signal: self.clone(),
        }
    }
}

/// The reading half of a signal.
#[derive(Clone)]
pub struct ReadSignal<T> {
    signal: Signal<T>,
}

impl<T: Clone + Send + Sync + 'static> ReadSignal<T> {
    pub fn get(&self) -> T {
        self.signal.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.signal.with(f)
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
}

/// The writing half of a signal.
#[derive(Clone)]
pub struct WriteSignal<T> {
    signal: Signal<T>,
}

impl<T: Clone + Send + Sync + 'static> WriteSignal<T> {
    pub fn set(&self, new_value: T) {
        self.signal.set(new_value);
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.signal.update(f);
    }
}

/// Create a deeply tracked signal split into its read and write halves.
///
/// # Example
///
/// ```
/// use statecell::create_signal;
///
/// let (count, set_count) = create_signal(0);
/// set_count.set(3);
/// assert_eq!(count.get(), 3);
/// ```
pub fn create_signal<T: Clone + Send + Sync + 'static>(initial: T) -> (ReadSignal<T>, WriteSignal<T>) {
    let signal = Signal::new(initial);
    (signal.read_only(), signal.write_only())
}

/// RAII guard for signal watchers.
pub struct WatchGuard {
    observer_id: usize,
    runtime: Weak<RwLock<RuntimeInner>>,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            if let Ok(mut runtime) = runtime.write() {
                runtime.remove_observer(self.observer_id);
            }
        }
    }
}
