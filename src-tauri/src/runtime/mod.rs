pub mod progress;
pub mod progress_hub;
pub mod progress_tracker;
pub mod sound;
