//! Typed preference documents and the service that loads and stores them.
//!
//! Small documents (keybinds, sound, TTS) live in the SQLite settings table.
//! `directories` is a human-editable JSON file under the app data dir.
//! Struct documents use `#[serde(default)]`, so a stored object missing a
//! newer field picks it up from `Default` without losing the rest.

use std::path::PathBuf;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::keybinds::{KeybindEntry, KeybindMap, KeybindSchema};
use crate::storage::{
    AsyncPersistedStore, FileStore, JsonSchema, LoadedExt, PersistedStore, SettingsStore,
    StorageError, Validate,
};

pub const SOUND_COLLECTIONS: &[&str] = &[
    "standard",
    "futuristic",
    "lisp",
    "nes",
    "piano",
    "robot",
    "sfx",
    "woodland",
];

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct SoundSettings {
    /// Which clip set under `sound/` to play.
    pub collection: String,
    /// 0.0 mutes move sounds entirely.
    pub volume: f64,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            collection: "standard".to_string(),
            volume: 0.8,
        }
    }
}

impl Validate for SoundSettings {
    fn validate(&self) -> Result<(), String> {
        if !SOUND_COLLECTIONS.contains(&self.collection.as_str()) {
            return Err(format!("unknown sound collection {:?}", self.collection));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(format!("volume {} outside 0..=1", self.volume));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct TtsSettings {
    pub enabled: bool,
    pub voice: Option<String>,
    pub language: String,
    pub rate: f64,
    pub volume: f64,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            voice: None,
            language: "en".to_string(),
            rate: 1.0,
            volume: 0.7,
        }
    }
}

impl Validate for TtsSettings {
    fn validate(&self) -> Result<(), String> {
        if self.language.trim().is_empty() {
            return Err("language must not be empty".to_string());
        }
        if !(0.5..=2.0).contains(&self.rate) {
            return Err(format!("rate {} outside 0.5..=2", self.rate));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(format!("volume {} outside 0..=1", self.volume));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct Directories {
    /// Where databases, engines and puzzles are kept. `None` means the
    /// platform default.
    pub documents: Option<PathBuf>,
}

impl Validate for Directories {
    fn validate(&self) -> Result<(), String> {
        match &self.documents {
            Some(path) if !path.is_absolute() => {
                Err(format!("documents dir must be absolute: {}", path.display()))
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceKey {
    Keybinds,
    Sound,
    Tts,
    Directories,
}

impl PreferenceKey {
    pub const ALL: [PreferenceKey; 4] = [
        PreferenceKey::Keybinds,
        PreferenceKey::Sound,
        PreferenceKey::Tts,
        PreferenceKey::Directories,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            PreferenceKey::Keybinds => "keybinds",
            PreferenceKey::Sound => "sound",
            PreferenceKey::Tts => "tts",
            PreferenceKey::Directories => "directories",
        }
    }
}

impl FromStr for PreferenceKey {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PreferenceKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| PreferenceError::Unknown(s.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("unknown preference: {0}")]
    Unknown(String),
    #[error("unknown keybind action: {0}")]
    UnknownAction(String),
}

fn to_json<T: Serialize>(key: PreferenceKey, value: &T) -> Result<serde_json::Value, PreferenceError> {
    serde_json::to_value(value).map_err(|source| {
        StorageError::Serialize {
            key: key.as_str().to_string(),
            source,
        }
        .into()
    })
}

fn from_json<T: DeserializeOwned + Validate>(
    key: PreferenceKey,
    value: serde_json::Value,
) -> Result<T, PreferenceError> {
    let invalid = |reason: String| PreferenceError::Invalid {
        key: key.as_str(),
        reason,
    };
    let parsed: T = serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;
    parsed.validate().map_err(invalid)?;
    Ok(parsed)
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct Preferences {
    settings: PersistedStore<SettingsStore>,
    documents: AsyncPersistedStore<FileStore>,
    keybind_schema: KeybindSchema,
    default_documents_dir: PathBuf,
}

impl Preferences {
    pub fn new(
        settings: SettingsStore,
        documents: FileStore,
        keybind_schema: KeybindSchema,
        default_documents_dir: PathBuf,
    ) -> Self {
        Self {
            settings: PersistedStore::new(settings),
            documents: AsyncPersistedStore::new(documents),
            keybind_schema,
            default_documents_dir,
        }
    }

    pub fn keybinds(&self) -> Result<KeybindMap, StorageError> {
        let key = PreferenceKey::Keybinds.as_str();
        let loaded = self
            .settings
            .get_item(key, &self.keybind_schema, self.keybind_schema.defaults().clone())?;
        Ok(loaded.or_repaired())
    }

    pub fn sound(&self) -> Result<SoundSettings, StorageError> {
        let loaded = self.settings.get_item(
            PreferenceKey::Sound.as_str(),
            &JsonSchema::<SoundSettings>::new(),
            SoundSettings::default(),
        )?;
        Ok(loaded.or_repaired())
    }

    pub fn tts(&self) -> Result<TtsSettings, StorageError> {
        let loaded = self.settings.get_item(
            PreferenceKey::Tts.as_str(),
            &JsonSchema::<TtsSettings>::new(),
            TtsSettings::default(),
        )?;
        Ok(loaded.or_repaired())
    }

    pub async fn directories(&self) -> Result<Directories, StorageError> {
        let loaded = self
            .documents
            .get_item(
                PreferenceKey::Directories.as_str(),
                &JsonSchema::<Directories>::new(),
                Directories::default(),
            )
            .await?;
        Ok(loaded.or_repaired())
    }

    /// The configured documents dir, or the platform default when unset.
    pub async fn documents_dir(&self) -> Result<PathBuf, StorageError> {
        Ok(self
            .directories()
            .await?
            .documents
            .unwrap_or_else(|| self.default_documents_dir.clone()))
    }

    #[cfg(test)]
    pub fn default_documents_dir(&self) -> &std::path::Path {
        &self.default_documents_dir
    }

    pub async fn get(&self, key: PreferenceKey) -> Result<serde_json::Value, PreferenceError> {
        match key {
            PreferenceKey::Keybinds => to_json(key, &self.keybinds()?),
            PreferenceKey::Sound => to_json(key, &self.sound()?),
            PreferenceKey::Tts => to_json(key, &self.tts()?),
            PreferenceKey::Directories => to_json(key, &self.directories().await?),
        }
    }

    /// Replace a whole document. Input that fails the schema is rejected
    /// rather than repaired.
    pub async fn set(&self, key: PreferenceKey, value: serde_json::Value) -> Result<(), PreferenceError> {
        let name = key.as_str();
        match key {
            PreferenceKey::Keybinds => {
                let map: KeybindMap = from_json_map(key, value)?;
                self.settings.set_item(name, &self.keybind_schema, &map)?;
            }
            PreferenceKey::Sound => {
                let sound: SoundSettings = from_json(key, value)?;
                self.settings
                    .set_item(name, &JsonSchema::<SoundSettings>::new(), &sound)?;
            }
            PreferenceKey::Tts => {
                let tts: TtsSettings = from_json(key, value)?;
                self.settings
                    .set_item(name, &JsonSchema::<TtsSettings>::new(), &tts)?;
            }
            PreferenceKey::Directories => {
                let dirs: Directories = from_json(key, value)?;
                self.documents
                    .set_item(name, &JsonSchema::<Directories>::new(), &dirs)
                    .await?;
            }
        }
        tracing::debug!("preference {name} updated");
        Ok(())
    }

    pub async fn remove(&self, key: PreferenceKey) -> Result<(), PreferenceError> {
        match key {
            PreferenceKey::Directories => self.documents.remove_item(key.as_str()).await?,
            _ => self.settings.remove_item(key.as_str())?,
        }
        Ok(())
    }

    /// JSON Schema of a document, for rendering settings editors.
    pub fn describe(key: PreferenceKey) -> serde_json::Value {
        let schema = match key {
            PreferenceKey::Keybinds => schemars::schema_for!(KeybindMap),
            PreferenceKey::Sound => schemars::schema_for!(SoundSettings),
            PreferenceKey::Tts => schemars::schema_for!(TtsSettings),
            PreferenceKey::Directories => schemars::schema_for!(Directories),
        };
        serde_json::to_value(schema).unwrap_or(serde_json::Value::Null)
    }

    pub fn set_keybind(&self, action: &str, keys: &str) -> Result<KeybindMap, PreferenceError> {
        let mut map = self.keybinds()?;
        let entry = map
            .get_mut(action)
            .ok_or_else(|| PreferenceError::UnknownAction(action.to_string()))?;
        let updated = KeybindEntry::new(entry.name.clone(), keys.trim());
        updated.validate().map_err(|reason| PreferenceError::Invalid {
            key: PreferenceKey::Keybinds.as_str(),
            reason,
        })?;
        *entry = updated;

        self.settings
            .set_item(PreferenceKey::Keybinds.as_str(), &self.keybind_schema, &map)?;
        // Return what a subsequent read sees, with chords normalized.
        Ok(self.keybinds()?)
    }

    pub fn reset_keybinds(&self) -> Result<KeybindMap, PreferenceError> {
        let defaults = self.keybind_schema.defaults().clone();
        self.settings
            .set_item(PreferenceKey::Keybinds.as_str(), &self.keybind_schema, &defaults)?;
        Ok(defaults)
    }
}

fn from_json_map(key: PreferenceKey, value: serde_json::Value) -> Result<KeybindMap, PreferenceError> {
    let map: KeybindMap = serde_json::from_value(value).map_err(|e| PreferenceError::Invalid {
        key: key.as_str(),
        reason: e.to_string(),
    })?;
    for (action, entry) in &map {
        entry.validate().map_err(|reason| PreferenceError::Invalid {
            key: key.as_str(),
            reason: format!("{action}: {reason}"),
        })?;
    }
    Ok(map)
}
