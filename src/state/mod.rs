//! Persisted reactive state.
//!
//! [`create_state`] wraps a value in a [`Signal`](crate::Signal), seeds it
//! from storage, writes it back on change and, for the local area, applies
//! changes other contexts make to the same key.

mod codec;
mod options;
mod state;

pub use options::StateOptions;
pub use state::{create_state, Setter, StateCell};
