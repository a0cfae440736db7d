use crate::error::{Result, StateError};
use crate::storage::StorageBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub(crate) fn encode<T: Serialize>(key: &str, value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|source| StateError::Encode {
        key: key.to_owned(),
        source,
    })
}

pub(crate) fn decode<T: DeserializeOwned>(key: &str, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|source| StateError::Decode {
        key: key.to_owned(),
        source,
    })
}

/// Read and decode the entry at `key`. Absent and empty entries are `None`.
pub(crate) fn load<T: DeserializeOwned>(storage: &dyn StorageBackend, key: &str) -> Result<Option<T>> {
    let stored = storage.get_item(key).map_err(|source| StateError::Storage {
        key: key.to_owned(),
        source,
    })?;
    match stored.as_deref() {
        None | Some("") => Ok(None),
        Some(text) => decode(key, text).map(Some),
    }
}

pub(crate) fn store<T: Serialize>(storage: &dyn StorageBackend, key: &str, value: &T) -> Result<()> {
    let text = encode(key, value)?;
    storage.set_item(key, &text).map_err(|source| StateError::Storage {
        key: key.to_owned(),
        source,
    })
}
