use super::{AsyncKeyValueStore, KeyValueStore, Schema, StorageError};

/// A stored value failed its schema and was replaced by the caller's default.
#[derive(Debug, Clone, PartialEq)]
pub struct CorruptionRepaired<V> {
    pub key: String,
    pub reason: String,
    /// The default that was written back and should be used.
    pub value: V,
}

impl<V> CorruptionRepaired<V> {
    pub fn into_value(self) -> V {
        self.value
    }
}

/// Outcome of a successful read: either the stored value or a repaired default.
pub type Loaded<V> = Result<V, CorruptionRepaired<V>>;

pub trait LoadedExt<V> {
    /// Accept a repaired default, logging the repair as a warning.
    fn or_repaired(self) -> V;
}

impl<V> LoadedExt<V> for Loaded<V> {
    fn or_repaired(self) -> V {
        match self {
            Ok(value) => value,
            Err(repaired) => {
                tracing::warn!(
                    key = %repaired.key,
                    "invalid stored value replaced with default: {}",
                    repaired.reason
                );
                repaired.into_value()
            }
        }
    }
}

fn encode<Sc: Schema>(
    key: &str,
    schema: &Sc,
    value: &Sc::Value,
    pretty: bool,
) -> Result<String, StorageError> {
    schema
        .encode(value, pretty)
        .map_err(|source| StorageError::Serialize {
            key: key.to_string(),
            source,
        })
}

// ---------------------------------------------------------------------------
// Synchronous
// ---------------------------------------------------------------------------

/// Schema-checked view over a synchronous store.
pub struct PersistedStore<S> {
    store: S,
}

impl<S: KeyValueStore> PersistedStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Read `key`. Missing keys are seeded with `initial`; corrupt ones are
    /// overwritten with it and reported as `CorruptionRepaired`.
    pub fn get_item<Sc: Schema>(
        &self,
        key: &str,
        schema: &Sc,
        initial: Sc::Value,
    ) -> Result<Loaded<Sc::Value>, StorageError> {
        let Some(raw) = self.store.get(key)? else {
            self.set_item(key, schema, &initial)?;
            return Ok(Ok(initial));
        };

        match schema.decode(&raw) {
            Ok(value) => Ok(Ok(value)),
            Err(e) => {
                self.set_item(key, schema, &initial)?;
                Ok(Err(CorruptionRepaired {
                    key: key.to_string(),
                    reason: e.to_string(),
                    value: initial,
                }))
            }
        }
    }

    pub fn set_item<Sc: Schema>(
        &self,
        key: &str,
        schema: &Sc,
        value: &Sc::Value,
    ) -> Result<(), StorageError> {
        let raw = encode(key, schema, value, self.store.human_editable())?;
        self.store.set(key, &raw)
    }

    pub fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.store.remove(key)
    }
}

// ---------------------------------------------------------------------------
// Asynchronous
// ---------------------------------------------------------------------------

/// Schema-checked view over an asynchronous store. Repairs are awaited before
/// the read resolves.
pub struct AsyncPersistedStore<S> {
    store: S,
}

impl<S: AsyncKeyValueStore> AsyncPersistedStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub fn inner(&self) -> &S {
        &self.store
    }

    pub async fn get_item<Sc: Schema>(
        &self,
        key: &str,
        schema: &Sc,
        initial: Sc::Value,
    ) -> Result<Loaded<Sc::Value>, StorageError> {
        let Some(raw) = self.store.get(key).await? else {
            self.set_item(key, schema, &initial).await?;
            return Ok(Ok(initial));
        };

        match schema.decode(&raw) {
            Ok(value) => Ok(Ok(value)),
            Err(e) => {
                self.set_item(key, schema, &initial).await?;
                Ok(Err(CorruptionRepaired {
                    key: key.to_string(),
                    reason: e.to_string(),
                    value: initial,
                }))
            }
        }
    }

    pub async fn set_item<Sc: Schema>(
        &self,
        key: &str,
        schema: &Sc,
        value: &Sc::Value,
    ) -> Result<(), StorageError> {
        let raw = encode(key, schema, value, self.store.human_editable())?;
        self.store.set(key, &raw).await
    }

    pub async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.store.remove(key).await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::storage::{FileStore, JsonSchema, MemoryStore, Validate};

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Board {
        theme: String,
        coordinates: bool,
    }

    impl Validate for Board {
        fn validate(&self) -> Result<(), String> {
            if self.theme.is_empty() {
                return Err("theme must not be empty".to_string());
            }
            Ok(())
        }
    }

    fn default_board() -> Board {
        Board {
            theme: "brown".to_string(),
            coordinates: true,
        }
    }

    const SCHEMA: JsonSchema<Board> = JsonSchema::new();

    #[test]
    fn set_then_get_returns_equal_value() {
        let store = PersistedStore::new(MemoryStore::new());
        let value = Board {
            theme: "blue".to_string(),
            coordinates: false,
        };

        store.set_item("board", &SCHEMA, &value).unwrap();
        let loaded = store.get_item("board", &SCHEMA, default_board()).unwrap();

        assert_eq!(loaded, Ok(value));
    }

    #[test]
    fn missing_key_is_seeded_with_default() {
        let store = PersistedStore::new(MemoryStore::new());

        let loaded = store.get_item("board", &SCHEMA, default_board()).unwrap();

        assert_eq!(loaded, Ok(default_board()));
        assert_eq!(store.inner().write_count(), 1);
        assert!(KeyValueStore::get(store.inner(), "board").unwrap().is_some());
    }

    #[test]
    fn corrupt_value_is_repaired_once() {
        let store = PersistedStore::new(MemoryStore::new());
        KeyValueStore::set(store.inner(), "board", "{ not json").unwrap();
        let writes_before = store.inner().write_count();

        let first = store.get_item("board", &SCHEMA, default_board()).unwrap();
        let repaired = first.unwrap_err();
        assert_eq!(repaired.key, "board");
        assert_eq!(repaired.value, default_board());
        assert_eq!(store.inner().write_count(), writes_before + 1);

        let second = store.get_item("board", &SCHEMA, default_board()).unwrap();
        assert_eq!(second, Ok(default_board()));
        assert_eq!(store.inner().write_count(), writes_before + 1);
    }

    #[test]
    fn schema_violation_counts_as_corruption() {
        let store = PersistedStore::new(MemoryStore::new());
        KeyValueStore::set(store.inner(), "board", r#"{"theme":"","coordinates":true}"#).unwrap();

        let loaded = store.get_item("board", &SCHEMA, default_board()).unwrap();

        assert!(loaded.is_err());
        assert_eq!(loaded.or_repaired(), default_board());
    }

    #[test]
    fn remove_item_deletes_key() {
        let store = PersistedStore::new(MemoryStore::new());
        store.set_item("board", &SCHEMA, &default_board()).unwrap();

        store.remove_item("board").unwrap();

        assert!(KeyValueStore::get(store.inner(), "board").unwrap().is_none());
    }

    #[tokio::test]
    async fn async_store_repairs_before_resolving() {
        let dir = tempfile::tempdir().unwrap();
        let store = AsyncPersistedStore::new(FileStore::new(dir.path()));
        std::fs::write(dir.path().join("board.json"), "[]").unwrap();

        let loaded = store.get_item("board", &SCHEMA, default_board()).await.unwrap();
        assert!(loaded.is_err());

        let on_disk = std::fs::read_to_string(dir.path().join("board.json")).unwrap();
        assert_eq!(SCHEMA.decode(&on_disk).unwrap(), default_board());
    }

    #[tokio::test]
    async fn async_file_store_pretty_prints() {
        let dir = tempfile::tempdir().unwrap();
        let store = AsyncPersistedStore::new(FileStore::new(dir.path()));

        store.set_item("board", &SCHEMA, &default_board()).await.unwrap();

        let on_disk = std::fs::read_to_string(dir.path().join("board.json")).unwrap();
        assert!(on_disk.contains("\n  \"theme\": \"brown\""));
        let loaded = store.get_item("board", &SCHEMA, default_board()).await.unwrap();
        assert_eq!(loaded, Ok(default_board()));
    }
}
