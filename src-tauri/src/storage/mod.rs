//! Key-value persistence for user preferences.
//!
//! Three layers:
//! - `backend`: raw string stores (SQLite settings table, files)
//! - `memory`: in-process store used by tests
//! - `schema`: parse + validate stored text into typed values
//! - `adapter`: typed get/set/remove that repairs corrupt entries in place
//!
//! Corrupt values never surface as errors. A read that fails validation
//! writes the caller's default back and reports `CorruptionRepaired` so the
//! caller decides whether to log, alert, or ignore it.

mod adapter;
mod backend;
#[cfg(test)]
mod memory;
mod schema;

pub use adapter::{AsyncPersistedStore, CorruptionRepaired, Loaded, LoadedExt, PersistedStore};
pub use backend::{AsyncKeyValueStore, FileStore, KeyValueStore, SettingsStore};
#[cfg(test)]
pub use memory::MemoryStore;
pub use schema::{JsonSchema, Schema, SchemaError, Validate};

use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0}")]
    Db(#[from] DbError),
    #[error("io error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
    #[error("failed to serialize {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
