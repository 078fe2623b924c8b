//! Shared fixtures for unit tests.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::core::keybinds::KeybindSchema;
use crate::core::preferences::Preferences;
use crate::db::Database;
use crate::runtime::sound::{Clock, SoundCue, SoundError, SoundSink};
use crate::storage::{FileStore, SettingsStore};

/// Preferences over an in-memory database and a temp documents dir.
pub struct TestPreferences {
    pub dir: TempDir,
    pub db: Arc<Database>,
    pub preferences: Arc<Preferences>,
}

impl TestPreferences {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let db = Arc::new(Database::open_in_memory().expect("in-memory DB"));
        let preferences = Arc::new(Preferences::new(
            SettingsStore::new(db.clone()),
            FileStore::new(dir.path().join("documents")),
            KeybindSchema::default(),
            dir.path().join("library"),
        ));
        Self {
            dir,
            db,
            preferences,
        }
    }

    /// A second handle on the same settings table, for poking raw values.
    pub fn settings_store(&self) -> SettingsStore {
        SettingsStore::new(self.db.clone())
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock().unwrap()
    }
}

#[derive(Default)]
pub struct RecordingSink {
    played: Mutex<Vec<SoundCue>>,
}

impl RecordingSink {
    pub fn played(&self) -> Vec<SoundCue> {
        self.played.lock().unwrap().clone()
    }
}

impl SoundSink for RecordingSink {
    fn play(&self, cue: &SoundCue) -> Result<(), SoundError> {
        self.played.lock().unwrap().push(cue.clone());
        Ok(())
    }
}
