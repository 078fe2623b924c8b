use std::time::Duration;

use tauri::Emitter;
use tokio::sync::broadcast;
use tokio::time;

use super::event_types::{coalesce_key, should_flush_immediately};
use super::BusEvent;

const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_MAX_BATCH: usize = 50;

pub struct EventBatcher;

impl EventBatcher {
    /// Spawn a background task that forwards bus events to the Tauri
    /// frontend, emitting each payload on its channel name.
    ///
    /// - Immediate events (sound cues, finished progress) are emitted
    ///   instantly after flushing whatever is buffered.
    /// - In-flight progress updates are buffered and flushed every 100ms or
    ///   when the buffer reaches 50 events. A newer update for a buffered job
    ///   replaces the older one in place.
    pub fn start(
        mut rx: broadcast::Receiver<BusEvent>,
        app_handle: tauri::AppHandle,
    ) -> tauri::async_runtime::JoinHandle<()> {
        tauri::async_runtime::spawn(async move {
            let mut buffer: Vec<BusEvent> = Vec::with_capacity(DEFAULT_MAX_BATCH);
            let mut interval = time::interval(DEFAULT_FLUSH_INTERVAL);

            loop {
                tokio::select! {
                    result = rx.recv() => {
                        match result {
                            Ok(event) => {
                                if should_flush_immediately(&event) {
                                    // Flush buffer first so ordering is preserved
                                    flush(&app_handle, &mut buffer);
                                    emit(&app_handle, &event);
                                } else {
                                    coalesce_into(&mut buffer, event);
                                    if buffer.len() >= DEFAULT_MAX_BATCH {
                                        flush(&app_handle, &mut buffer);
                                    }
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                tracing::warn!("event batcher lagged, dropped {n} events");
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                flush(&app_handle, &mut buffer);
                                break;
                            }
                        }
                    }
                    _ = interval.tick() => {
                        flush(&app_handle, &mut buffer);
                    }
                }
            }
        })
    }
}

/// Push `event`, replacing a buffered event with the same coalesce key.
fn coalesce_into(buffer: &mut Vec<BusEvent>, event: BusEvent) {
    if let Some(key) = coalesce_key(&event) {
        if let Some(slot) = buffer
            .iter_mut()
            .find(|buffered| coalesce_key(buffered) == Some(key))
        {
            *slot = event;
            return;
        }
    }
    buffer.push(event);
}

fn emit(app_handle: &tauri::AppHandle, event: &BusEvent) {
    if let Err(e) = app_handle.emit(&event.channel, &event.payload) {
        tracing::warn!("failed to emit {} event to frontend: {e}", event.channel);
    }
}

fn flush(app_handle: &tauri::AppHandle, buffer: &mut Vec<BusEvent>) {
    for event in buffer.drain(..) {
        emit(app_handle, &event);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::bus::event_types::{CHANNEL_PROGRESS, CHANNEL_SOUND};

    fn progress(seq: i64, id: &str, value: f64) -> BusEvent {
        BusEvent {
            id: format!("e{seq}"),
            seq,
            channel: CHANNEL_PROGRESS.to_string(),
            payload: json!({ "id": id, "progress": value, "finished": false }),
            created_at: String::new(),
        }
    }

    #[test]
    fn coalescing_keeps_latest_update_in_first_seen_position() {
        let mut buffer = Vec::new();
        coalesce_into(&mut buffer, progress(0, "a", 10.0));
        coalesce_into(&mut buffer, progress(1, "b", 5.0));
        coalesce_into(&mut buffer, progress(2, "a", 30.0));

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer[0].payload["id"], "a");
        assert_eq!(buffer[0].payload["progress"], 30.0);
        assert_eq!(buffer[1].payload["id"], "b");
    }

    #[test]
    fn non_progress_events_are_never_merged() {
        let mut buffer = Vec::new();
        let sound = BusEvent {
            id: "s".to_string(),
            seq: 0,
            channel: CHANNEL_SOUND.to_string(),
            payload: json!({ "id": "a" }),
            created_at: String::new(),
        };
        coalesce_into(&mut buffer, sound.clone());
        coalesce_into(&mut buffer, sound);

        assert_eq!(buffer.len(), 2);
    }
}
