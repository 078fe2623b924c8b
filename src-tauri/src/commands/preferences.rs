use std::future::Future;
use std::sync::Arc;

use crate::core::preferences::{PreferenceError, PreferenceKey, Preferences};
use crate::{AppError, AppState};

#[tauri::command]
pub async fn get_preference(
    state: tauri::State<'_, AppState>,
    key: String,
) -> Result<serde_json::Value, AppError> {
    let key: PreferenceKey = key.parse()?;
    with_preferences(&state.preferences, key, move |prefs| async move { prefs.get(key).await }).await
}

#[tauri::command]
pub async fn set_preference(
    state: tauri::State<'_, AppState>,
    key: String,
    value: serde_json::Value,
) -> Result<(), AppError> {
    let key: PreferenceKey = key.parse()?;
    with_preferences(&state.preferences, key, move |prefs| async move {
        prefs.set(key, value).await
    })
    .await
}

#[tauri::command]
pub async fn remove_preference(
    state: tauri::State<'_, AppState>,
    key: String,
) -> Result<(), AppError> {
    let key: PreferenceKey = key.parse()?;
    with_preferences(&state.preferences, key, move |prefs| async move { prefs.remove(key).await }).await
}

#[tauri::command]
pub fn describe_preference(key: String) -> Result<serde_json::Value, AppError> {
    let key: PreferenceKey = key.parse()?;
    Ok(Preferences::describe(key))
}

/// Settings-table documents go through SQLite behind a mutex, so they run on
/// the blocking pool. The file-backed document stays on the async path.
async fn with_preferences<T, F, Fut>(
    preferences: &Arc<Preferences>,
    key: PreferenceKey,
    op: F,
) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(Arc<Preferences>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, PreferenceError>> + Send,
{
    let preferences = Arc::clone(preferences);
    if key == PreferenceKey::Directories {
        return Ok(op(preferences).await?);
    }
    let result =
        tauri::async_runtime::spawn_blocking(move || tauri::async_runtime::block_on(op(preferences)))
            .await?;
    Ok(result?)
}
