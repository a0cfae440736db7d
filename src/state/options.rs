use crate::error::{Result, StateError};
use crate::signal::Tracking;
use crate::storage::StorageType;
use serde::{Deserialize, Serialize};

/// Configuration for [`create_state`](crate::create_state).
///
/// Every field is optional when deserialized; field names are camelCase so a
/// document like `{"persist": true, "storageKey": "counter"}` works as is.
///
/// ```
/// use statecell::{StateOptions, StorageType};
///
/// let options = StateOptions::new()
///     .persisted("counter")
///     .storage_type(StorageType::Session);
/// assert!(options.persistence_enabled());
/// assert!(!options.sync_enabled());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StateOptions {
    /// Track only top-level replacement of the value.
    pub shallow: bool,
    pub persist: bool,
    pub storage_key: String,
    pub storage_type: StorageType,
    /// Persist on in-place mutation as well as on replacement.
    pub deep_watch: bool,
    /// Apply changes other contexts make to the same key.
    pub sync_tabs: bool,
}

impl StateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON object.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(StateError::InvalidOptions)
    }

    pub fn shallow(mut self, shallow: bool) -> Self {
        self.shallow = shallow;
        self
    }

    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Shorthand for `.persist(true).storage_key(key)`.
    pub fn persisted(self, key: impl Into<String>) -> Self {
        self.persist(true).storage_key(key)
    }

    pub fn storage_type(mut self, storage_type: StorageType) -> Self {
        self.storage_type = storage_type;
        self
    }

    pub fn deep_watch(mut self, deep_watch: bool) -> Self {
        self.deep_watch = deep_watch;
        self
    }

    pub fn sync_tabs(mut self, sync_tabs: bool) -> Self {
        self.sync_tabs = sync_tabs;
        self
    }

    /// Load, write-back and sync all require a persisted, non-empty key.
    pub fn persistence_enabled(&self) -> bool {
        self.persist && !self.storage_key.is_empty()
    }

    /// Session areas are private to their context, so only local-area state
    /// can be synced.
    pub fn sync_enabled(&self) -> bool {
        self.persistence_enabled() && self.sync_tabs && self.storage_type == StorageType::Local
    }

    pub fn tracking(&self) -> Tracking {
        if self.shallow {
            Tracking::Shallow
        } else {
            Tracking::Deep
        }
    }
}
