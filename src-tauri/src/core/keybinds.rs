//! Configurable keyboard shortcuts.
//!
//! The built-in table decides *which* actions exist; the stored map decides
//! each action's current chord. Reads merge missing defaults in, writes
//! rewrite `meta` to the platform modifier.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::storage::{Schema, SchemaError, Validate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct KeybindEntry {
    /// Display label shown in the settings table.
    pub name: String,
    /// Chord spec: `+`-joined key tokens, e.g. `ctrl+shift+s`.
    pub keys: String,
}

impl KeybindEntry {
    pub fn new(name: impl Into<String>, keys: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: keys.into(),
        }
    }
}

impl Validate for KeybindEntry {
    fn validate(&self) -> Result<(), String> {
        if self.keys.trim().is_empty() {
            return Err(format!("empty chord for {:?}", self.name));
        }
        if self.keys.split('+').any(|token| token.trim().is_empty()) {
            return Err(format!("malformed chord {:?}", self.keys));
        }
        Ok(())
    }
}

/// Action identifier → binding.
pub type KeybindMap = BTreeMap<String, KeybindEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Other,
}

impl Platform {
    pub const fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Other
        }
    }

    pub const fn modifier(self) -> &'static str {
        match self {
            Platform::MacOs => "cmd",
            Platform::Other => "ctrl",
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const DEFAULT_KEYBINDS: &[(&str, &str, &str)] = &[
    ("NEW_TAB", "New tab", "ctrl+t"),
    ("CLOSE_TAB", "Close tab", "ctrl+w"),
    ("NEXT_TAB", "Next tab", "ctrl+tab"),
    ("PREVIOUS_TAB", "Previous tab", "ctrl+shift+tab"),
    ("OPEN_FILE", "Open file", "ctrl+o"),
    ("SAVE_FILE", "Save file", "ctrl+s"),
    ("NEW_BOARD_TAB", "New board", "ctrl+b"),
    ("PLAY_BOARD", "Play vs engine", "ctrl+p"),
    ("SWAP_ORIENTATION", "Flip board", "f"),
    ("CLEAR_SHAPES", "Clear arrows", "ctrl+l"),
    ("TOGGLE_EVAL_BAR", "Toggle evaluation bar", "z"),
    ("TOGGLE_ALL_ENGINES", "Toggle all engines", "ctrl+a"),
    ("TOGGLE_BLUR", "Blur board", "ctrl+shift+b"),
    ("NEXT_MOVE", "Next move", "arrowright"),
    ("PREVIOUS_MOVE", "Previous move", "arrowleft"),
    ("GO_TO_START", "Go to start", "arrowup"),
    ("GO_TO_END", "Go to end", "arrowdown"),
    ("GO_TO_BRANCH_START", "Go to branch start", "shift+arrowup"),
    ("GO_TO_BRANCH_END", "Go to branch end", "shift+arrowdown"),
    ("DELETE_MOVE", "Delete move", "delete"),
    ("ANALYSIS_TAB", "Analysis tab", "ctrl+1"),
    ("DATABASE_TAB", "Database tab", "ctrl+2"),
    ("PRACTICE_TAB", "Practice tab", "ctrl+3"),
];

pub fn default_keybinds() -> KeybindMap {
    DEFAULT_KEYBINDS
        .iter()
        .map(|(action, name, keys)| (action.to_string(), KeybindEntry::new(*name, *keys)))
        .collect()
}

// ---------------------------------------------------------------------------
// Merge & normalize
// ---------------------------------------------------------------------------

/// Inject every default action missing from `stored`. Stored entries win and
/// stored-only actions are kept.
pub fn merge_defaults(mut stored: KeybindMap, defaults: &KeybindMap) -> KeybindMap {
    for (action, entry) in defaults {
        stored
            .entry(action.clone())
            .or_insert_with(|| entry.clone());
    }
    stored
}

/// Rewrite `meta` tokens to the platform modifier.
pub fn normalize_chord(keys: &str, platform: Platform) -> String {
    keys.split('+')
        .map(|token| {
            if token.trim().eq_ignore_ascii_case("meta") {
                platform.modifier()
            } else {
                token
            }
        })
        .collect::<Vec<_>>()
        .join("+")
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

pub struct KeybindSchema {
    defaults: KeybindMap,
    platform: Platform,
}

impl KeybindSchema {
    pub fn new(defaults: KeybindMap, platform: Platform) -> Self {
        Self { defaults, platform }
    }

    pub fn defaults(&self) -> &KeybindMap {
        &self.defaults
    }
}

impl Default for KeybindSchema {
    fn default() -> Self {
        Self::new(default_keybinds(), Platform::current())
    }
}

impl Schema for KeybindSchema {
    type Value = KeybindMap;

    fn decode(&self, raw: &str) -> Result<KeybindMap, SchemaError> {
        let stored: KeybindMap = serde_json::from_str(raw)?;
        for (action, entry) in &stored {
            entry
                .validate()
                .map_err(|e| SchemaError::Invalid(format!("{action}: {e}")))?;
        }
        Ok(merge_defaults(stored, &self.defaults))
    }

    fn encode(&self, value: &KeybindMap, pretty: bool) -> Result<String, serde_json::Error> {
        let normalized: KeybindMap = value
            .iter()
            .map(|(action, entry)| {
                (
                    action.clone(),
                    KeybindEntry::new(entry.name.clone(), normalize_chord(&entry.keys, self.platform)),
                )
            })
            .collect();
        if pretty {
            serde_json::to_string_pretty(&normalized)
        } else {
            serde_json::to_string(&normalized)
        }
    }
}
