pub mod keybinds;
pub mod preferences;
