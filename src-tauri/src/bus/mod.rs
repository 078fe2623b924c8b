//! Event system for backend → webview notifications.
//!
//! Events flow from backend → EventBus → EventBatcher → Frontend:
//! - `EventBus`: in-memory broadcast channel for immediate distribution
//! - `EventBatcher`: buffers in-flight progress updates (100ms/50 events),
//!   coalescing them per job, before emitting them to the webview
//! - In-process consumers (the progress hub) subscribe to the bus directly

mod batcher;
mod event_bus;
pub mod event_types;

pub use batcher::EventBatcher;
pub use event_bus::{BusEvent, EventBus};
