//! Reactive primitives.
//!
//! A [`Signal`] is an owned value plus a list of watchers. Watchers are either
//! shallow (top-level replacement only) or deep (in-place mutation too), and
//! each one is released by dropping its [`WatchGuard`].

mod signal;

pub use signal::{
    create_signal, ReadSignal, Signal, Tracking, WatchGuard, WatchOptions, WriteSignal,
};
