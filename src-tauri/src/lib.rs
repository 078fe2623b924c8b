//! Kibitz native shell library.
//!
//! This is the main entry point for the Tauri application backend. It handles:
//! - Application initialization and state management
//! - Tauri command registration and IPC handling
//! - Database setup and migration
//! - Event forwarding to the webview
//!
//! # Architecture
//!
//! - `commands`: Tauri command handlers (IPC entry points)
//! - `storage`: schema-validated key-value persistence with self-repair
//! - `core`: preference documents and keybind maps
//! - `runtime`: job progress tracking and move sounds
//! - `bus`: event bus for real-time communication
//! - `db`: SQLite settings table

mod bus;
mod commands;
mod config;
mod core;
mod db;
mod runtime;
mod storage;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use serde::Serialize;

use crate::bus::{EventBatcher, EventBus};
use crate::config::AppConfig;
use crate::core::keybinds::KeybindSchema;
use crate::core::preferences::{PreferenceError, Preferences};
use crate::db::Database;
use crate::runtime::progress::{ProgressError, ProgressRegistry};
use crate::runtime::progress_hub::ProgressHub;
use crate::runtime::sound::{BusSoundSink, SoundError, SoundPlayer};
use crate::storage::{FileStore, SettingsStore, StorageError};

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

/// Errors returned to the webview. Serialized as the message string, which the
/// UI shows as a notification.
#[derive(Debug, thiserror::Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Preference(#[from] PreferenceError),
    #[error("{0}")]
    Progress(#[from] ProgressError),
    #[error("{0}")]
    Sound(#[from] SoundError),
    #[error("background task failed: {0}")]
    Task(#[from] tauri::Error),
}

impl Serialize for AppError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub(crate) struct AppState {
    pub preferences: Arc<Preferences>,
    pub progress: Arc<ProgressRegistry>,
    pub hub: ProgressHub,
    pub sound: SoundPlayer,
}

impl AppState {
    pub(crate) fn new(db: Arc<Database>, bus: Arc<EventBus>, config: &AppConfig) -> Self {
        let preferences = Arc::new(Preferences::new(
            SettingsStore::new(db),
            FileStore::new(&config.documents_store_dir),
            KeybindSchema::default(),
            config.default_documents_dir.clone(),
        ));
        let sound = SoundPlayer::new(preferences.clone(), Arc::new(BusSoundSink::new(bus.clone())));
        Self {
            preferences,
            progress: Arc::new(ProgressRegistry::new(bus)),
            hub: ProgressHub::new(),
            sound,
        }
    }
}

// ---------------------------------------------------------------------------
// Application entry point
// ---------------------------------------------------------------------------

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    if cfg!(debug_assertions) {
        let _ = dotenvy::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kibitz=debug,info".parse().expect("valid env filter")),
        )
        .init();

    let config = AppConfig::from_env();
    config.ensure_dirs().expect("failed to prepare app data directory");
    let db = Arc::new(Database::open(&config.db_path).expect("failed to open database"));
    let bus = Arc::new(EventBus::new());
    let state = AppState::new(db, bus.clone(), &config);
    let hub = state.hub.clone();

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_opener::init())
        .manage(state)
        .invoke_handler(tauri::generate_handler![
            // preferences
            commands::preferences::get_preference,
            commands::preferences::set_preference,
            commands::preferences::remove_preference,
            commands::preferences::describe_preference,
            // keybinds
            commands::keybinds::get_keybinds,
            commands::keybinds::set_keybind,
            commands::keybinds::reset_keybinds,
            // progress
            commands::progress::start_job,
            commands::progress::report_progress,
            commands::progress::get_progress,
            commands::progress::clear_progress,
            commands::progress::list_progress,
            commands::progress::wait_for_progress,
            commands::progress::wait_for_jobs,
            // sound
            commands::sound::play_sound,
        ])
        .setup(move |app| {
            EventBatcher::start(bus.subscribe(), app.handle().clone());
            hub.spawn_consumer(bus.subscribe());

            tracing::info!("Kibitz started, data dir {}", config.data_dir.display());
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
