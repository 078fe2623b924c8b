use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::StorageError;
use crate::db::{queries, Database};

/// Raw string-keyed store read and written on the calling thread.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, raw: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Whether users are expected to open and edit the stored text by hand.
    fn human_editable(&self) -> bool {
        false
    }
}

/// Raw string-keyed store whose operations suspend.
#[async_trait]
pub trait AsyncKeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, raw: &str) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    fn human_editable(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// SQLite settings table
// ---------------------------------------------------------------------------

pub struct SettingsStore {
    db: Arc<Database>,
}

impl SettingsStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl KeyValueStore for SettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(queries::get_setting(&self.db, key)?)
    }

    fn set(&self, key: &str, raw: &str) -> Result<(), StorageError> {
        queries::upsert_setting(&self.db, key, raw, &Utc::now().to_rfc3339())?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        queries::delete_setting(&self.db, key)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// One JSON document per key under `dir`, written atomically via rename.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.contains(['/', '\\'])
            && !key.contains("..")
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn io_err(key: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        key: key.to_string(),
        source,
    }
}

#[async_trait]
impl AsyncKeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(key)(e)),
        }
    }

    async fn set(&self, key: &str, raw: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(io_err(key))?;

        // Each writer gets its own temp file; the last rename wins.
        let tmp = self.dir.join(format!("{key}.json.{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp, raw).await.map_err(io_err(key))?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_err(key))?;
        tracing::debug!("wrote {}", path.display());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(key)(e)),
        }
    }

    fn human_editable(&self) -> bool {
        true
    }
}
