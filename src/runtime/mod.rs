//! Runtime support for reactive primitives.
//!
//! This module provides the watcher registry and the execution contexts
//! (global and scoped) that signals notify through.

mod context;

pub use context::{ChangeKind, ReactiveRuntime, RuntimeInner};
