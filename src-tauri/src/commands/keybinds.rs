use crate::core::keybinds::KeybindMap;
use crate::{AppError, AppState};

#[tauri::command]
pub fn get_keybinds(state: tauri::State<'_, AppState>) -> Result<KeybindMap, AppError> {
    Ok(state.preferences.keybinds()?)
}

#[tauri::command]
pub fn set_keybind(
    state: tauri::State<'_, AppState>,
    action: String,
    keys: String,
) -> Result<KeybindMap, AppError> {
    Ok(state.preferences.set_keybind(&action, &keys)?)
}

#[tauri::command]
pub fn reset_keybinds(state: tauri::State<'_, AppState>) -> Result<KeybindMap, AppError> {
    Ok(state.preferences.reset_keybinds()?)
}
