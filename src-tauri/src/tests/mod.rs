//! Cross-module scenarios exercising `AppState` the way the commands do.
