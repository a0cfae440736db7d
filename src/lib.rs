//! # Statecell
//!
//! Reactive state cells with optional persistence to a key-value storage area
//! and optional synchronization across execution contexts.
//!
//! ## Signals
//!
//! - `Signal<T>` - Reactive value with shallow or deep tracking
//! - `WatchGuard` - Disposer returned by every watch; drop it to unsubscribe
//!
//! ## Storage
//!
//! - `Origin` - Local storage area and event bus shared by its contexts
//! - `StorageContext` - One context: local area, private session area, events
//! - `MemoryStorage` / `FileStorage` - Storage backends
//!
//! ## State cells
//!
//! `create_state` composes the two: it seeds a signal from storage, writes it
//! back on change and applies changes other contexts make to the same key.
//!
//! ```
//! use statecell::{Origin, StateOptions};
//!
//! let origin = Origin::new();
//! let tab_a = origin.open_context();
//! let tab_b = origin.open_context();
//! let options = StateOptions::new().persisted("theme").sync_tabs(true);
//!
//! let (_theme_a, set_theme_a) = tab_a.create_state("light".to_string(), options.clone());
//! let (theme_b, _) = tab_b.create_state("light".to_string(), options);
//!
//! set_theme_a.set("dark".to_string());
//! assert_eq!(theme_b.get(), "dark");
//! ```

pub mod error;
pub mod runtime;
pub mod signal;
pub mod state;
pub mod storage;

// Re-export main types for convenience
pub use error::{StateError, StorageError};
pub use signal::{create_signal, ReadSignal, Signal, Tracking, WatchGuard, WatchOptions, WriteSignal};
pub use state::{create_state, Setter, StateCell, StateOptions};
pub use storage::{
    ContextId, FileStorage, MemoryStorage, Origin, StorageBackend, StorageContext, StorageEvent,
    StorageEventBus, StorageListener, StorageType,
};
