pub mod keybinds;
pub mod preferences;
pub mod progress;
pub mod sound;
