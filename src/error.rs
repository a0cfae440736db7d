//! Error types.
//!
//! None of these escape a [`StateCell`](crate::StateCell): the cell logs them
//! and carries on with the in-memory value. They are public so storage
//! backends and callers working with [`StorageBackend`](crate::StorageBackend)
//! directly can match on them.

use thiserror::Error;

/// Failure reported by a storage area.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("writing {key:?} would exceed the storage quota of {quota} bytes")]
    QuotaExceeded { key: String, quota: usize },

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is not a JSON object of strings: {0}")]
    Corrupt(#[source] serde_json::Error),
}

/// Failure while loading, persisting or syncing a state value.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("stored value for {key:?} could not be decoded: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("value for {key:?} could not be encoded: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage access for {key:?} failed: {source}")]
    Storage {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("invalid state options: {0}")]
    InvalidOptions(#[source] serde_json::Error),
}

impl StateError {
    /// The storage key this error concerns, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Decode { key, .. } | Self::Encode { key, .. } | Self::Storage { key, .. } => {
                Some(key)
            }
            Self::InvalidOptions(_) => None,
        }
    }
}

pub type Result<T, E = StateError> = std::result::Result<T, E>;
