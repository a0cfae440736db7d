use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};

/// What happened to a signal's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// The whole value was replaced.
    Replaced,
    /// The value was mutated in place.
    Mutated,
}

type Callback = Arc<dyn Fn() + Send + Sync>;

struct Watcher {
    callback: Callback,
    deep: bool,
}

/// Reactive context holding the watcher graph.
struct ReactiveContext {
    // Map from signal ID to the watchers subscribed to it. IDs are handed out
    // in increasing order, so set iteration is registration order.
    dependencies: HashMap<usize, BTreeSet<usize>>,
    // Map from watcher ID to the signal it watches
    sources: HashMap<usize, usize>,
    watchers: HashMap<usize, Watcher>,
}

impl ReactiveContext {
    fn new() -> Self {
        Self {
            dependencies: HashMap::new(),
            sources: HashMap::new(),
            watchers: HashMap::new(),
        }
    }

    fn clear(&mut self) {
        self.dependencies.clear();
        self.sources.clear();
        self.watchers.clear();
    }
}

/// Inner runtime state that can be shared.
pub struct RuntimeInner {
    context: Mutex<ReactiveContext>,
}

impl RuntimeInner {
    fn new() -> Self {
        Self {
            context: Mutex::new(ReactiveContext::new()),
        }
    }

    fn context(&self) -> MutexGuard<'_, ReactiveContext> {
        self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn remove_observer(&mut self, observer_id: usize) {
        let mut ctx = self.context();
        ctx.watchers.remove(&observer_id);

        if let Some(signal_id) = ctx.sources.remove(&observer_id) {
            if let Some(deps) = ctx.dependencies.get_mut(&signal_id) {
                deps.remove(&observer_id);
                if deps.is_empty() {
                    ctx.dependencies.remove(&signal_id);
                }
            }
        }
    }

    fn clear(&mut self) {
        self.context().clear();
    }
}

/// Hybrid reactive runtime for managing reactive primitives.
///
/// Supports both global runtime (default) and scoped runtimes for isolation.
/// The runtime keeps the watcher registry for every signal created while it
/// is current and dispatches change notifications to them.
///
/// # Examples
///
/// Using the default global runtime:
///
/// ```
/// use statecell::Signal;
///
/// let signal = Signal::new(42);
/// assert_eq!(signal.get(), 42);
/// ```
///
/// Using scoped runtimes for isolation:
///
/// ```
/// use statecell::runtime::ReactiveRuntime;
/// use statecell::Signal;
///
/// ReactiveRuntime::scope(|| {
///     let signal = Signal::new(0);
///     assert_eq!(signal.get(), 0);
/// });
/// ```
pub struct ReactiveRuntime {
    next_id: AtomicUsize,
    inner: Arc<RwLock<RuntimeInner>>,
}

// Thread-local stack for scoped runtimes
thread_local! {
    static RUNTIME_STACK: RefCell<Vec<Arc<ReactiveRuntime>>> = const { RefCell::new(Vec::new()) };
}

impl ReactiveRuntime {
    /// Create a new isolated runtime.
    pub fn new() -> Arc<Self> {
        Arc::new(ReactiveRuntime {
            next_id: AtomicUsize::new(0),
            inner: Arc::new(RwLock::new(RuntimeInner::new())),
        })
    }

    /// Run a function with a fresh isolated runtime.
    ///
    /// Signals created inside `f` register their watchers with the scoped
    /// runtime rather than the global one.
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let runtime = Self::new();
        Self::with_runtime(runtime, f)
    }

    /// Get or create the global runtime (fallback).
    pub fn global() -> Arc<Self> {
        use std::sync::OnceLock;
        static RUNTIME: OnceLock<Arc<ReactiveRuntime>> = OnceLock::new();
        Arc::clone(RUNTIME.get_or_init(Self::new))
    }

    /// Get the current reactive runtime (scoped or global fallback).
    pub fn current() -> Arc<Self> {
        RUNTIME_STACK.with(|stack| stack.borrow().last().cloned().unwrap_or_else(Self::global))
    }

    /// Run a function with a specific runtime as the current context.
    ///
    /// # Examples
    ///
    /// ```
    /// use statecell::runtime::ReactiveRuntime;
    /// use statecell::Signal;
    ///
    /// let runtime = ReactiveRuntime::new();
    /// ReactiveRuntime::with_runtime(runtime, || {
    ///     let signal = Signal::new(42);
    ///     assert_eq!(signal.get(), 42);
    /// });
    /// ```
    pub fn with_runtime<F, R>(runtime: Arc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().push(runtime);
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// Drop every registered watcher.
    ///
    /// IDs keep counting up: guards created before the clear may still be
    /// dropped later and must not hit watchers registered after it.
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.clear();
    }

    /// Get a reference to the inner runtime state.
    pub fn inner(&self) -> Arc<RwLock<RuntimeInner>> {
        Arc::clone(&self.inner)
    }

    fn read_inner(&self) -> RwLockReadGuard<'_, RuntimeInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Generate the next unique ID for a reactive primitive.
    pub fn next_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Subscribe `watcher_id` to changes of `signal_id`.
    ///
    /// A shallow watcher only hears [`ChangeKind::Replaced`]; a deep one hears
    /// in-place mutations as well.
    pub fn register_watcher<F>(&self, signal_id: usize, watcher_id: usize, deep: bool, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = self.read_inner();
        let mut ctx = inner.context();
        ctx.dependencies
            .entry(signal_id)
            .or_default()
            .insert(watcher_id);
        ctx.sources.insert(watcher_id, signal_id);
        ctx.watchers.insert(
            watcher_id,
            Watcher {
                callback: Arc::new(callback),
                deep,
            },
        );
    }

    /// Notify the watchers of a signal, in registration order.
    ///
    /// Callbacks run after every runtime lock is released, so they may set
    /// signals themselves.
    pub fn notify_watchers(&self, signal_id: usize, kind: ChangeKind) {
        let callbacks: Vec<Callback> = {
            let inner = self.read_inner();
            let ctx = inner.context();
            let Some(ids) = ctx.dependencies.get(&signal_id) else {
                return;
            };
            ids.iter()
                .filter_map(|id| ctx.watchers.get(id))
                .filter(|watcher| kind == ChangeKind::Replaced || watcher.deep)
                .map(|watcher| Arc::clone(&watcher.callback))
                .collect()
        };

        for callback in callbacks {
            callback();
        }
    }

    /// Number of watchers currently subscribed to a signal.
    pub fn watcher_count(&self, signal_id: usize) -> usize {
        let inner = self.read_inner();
        let ctx = inner.context();
        ctx.dependencies.get(&signal_id).map_or(0, BTreeSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn shallow_watchers_skip_mutations() {
        let runtime = ReactiveRuntime::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let shallow = Arc::clone(&hits);
        runtime.register_watcher(0, 1, false, move || {
            shallow.fetch_add(1, Ordering::SeqCst);
        });
        let deep = Arc::clone(&hits);
        runtime.register_watcher(0, 2, true, move || {
            deep.fetch_add(10, Ordering::SeqCst);
        });

        runtime.notify_watchers(0, ChangeKind::Mutated);
        assert_eq!(hits.load(Ordering::SeqCst), 10);

        runtime.notify_watchers(0, ChangeKind::Replaced);
        assert_eq!(hits.load(Ordering::SeqCst), 21);
    }

    #[test]
    fn removed_watcher_is_not_notified() {
        let runtime = ReactiveRuntime::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        runtime.register_watcher(3, 4, false, move || {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(runtime.watcher_count(3), 1);

        runtime.inner().write().unwrap().remove_observer(4);
        runtime.notify_watchers(3, ChangeKind::Replaced);

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(runtime.watcher_count(3), 0);
    }

    #[test]
    fn clear_drops_watchers_but_keeps_ids_unique() {
        let runtime = ReactiveRuntime::new();
        runtime.register_watcher(runtime.next_id(), runtime.next_id(), false, || {});
        runtime.clear();

        assert_eq!(runtime.watcher_count(0), 0);
        assert_eq!(runtime.next_id(), 2);
    }

    #[test]
    fn scope_shadows_global_runtime() {
        let global = ReactiveRuntime::global();
        ReactiveRuntime::scope(|| {
            assert!(!Arc::ptr_eq(&ReactiveRuntime::current(), &global));
        });
        assert!(Arc::ptr_eq(&ReactiveRuntime::current(), &global));
    }
}
