//! Key-value text storage.
//!
//! An [`Origin`] owns one persistent ("local") storage area and the
//! [`StorageEventBus`] its contexts share. Each [`StorageContext`] opened on
//! it stands for one execution context: it sees the shared local area, owns a
//! private session area, and receives [`StorageEvent`]s for local writes made
//! by every *other* context.

mod context;
mod events;
mod file;
mod memory;

pub use context::{Origin, StorageContext};
pub use events::{ContextId, StorageEvent, StorageEventBus, StorageListener};
pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::StorageError;
use serde::{Deserialize, Serialize};

/// Which storage area a state cell persists to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Shared by every context of the origin, and the only area that
    /// produces cross-context events.
    #[default]
    Local,
    /// Private to one context.
    Session,
}

/// A key-value store of text entries.
///
/// Implementations must be cheap to call synchronously; the state cell reads
/// on construction and writes on every change.
pub trait StorageBackend: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    fn clear(&self) -> Result<(), StorageError>;

    /// Keys currently stored, in ascending order.
    fn keys(&self) -> Vec<String>;

    fn len(&self) -> usize {
        self.keys().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
