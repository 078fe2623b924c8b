use crate::runtime::sound::SoundCue;
use crate::{AppError, AppState};

#[tauri::command]
pub fn play_sound(
    state: tauri::State<'_, AppState>,
    capture: bool,
    check: bool,
) -> Result<Option<SoundCue>, AppError> {
    Ok(state.sound.play(capture, check)?)
}
