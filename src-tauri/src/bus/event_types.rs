//! Channel names and flush policy.
//!
//! Single source of truth for which events are "immediate" (emitted to the
//! webview without batching) vs batched, and how batched events coalesce.

use super::event_bus::BusEvent;

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// Job progress: payload is `{ id, progress, finished }`, or
/// `{ id, cleared: true }` once the job's item is discarded.
pub const CHANNEL_PROGRESS: &str = "progress";
/// Sound cues for the webview to play.
pub const CHANNEL_SOUND: &str = "sound";

// ---------------------------------------------------------------------------
// Flush policy
// ---------------------------------------------------------------------------

/// Returns true if this event should be sent to the frontend immediately
/// instead of being buffered. Immediate events preserve ordering with the
/// current buffer before being sent.
pub fn should_flush_immediately(event: &BusEvent) -> bool {
    match event.channel.as_str() {
        CHANNEL_SOUND => true,
        CHANNEL_PROGRESS => ["finished", "cleared"].iter().any(|flag| {
            event
                .payload
                .get(*flag)
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false)
        }),
        _ => false,
    }
}

/// Buffered events with the same key replace each other.
pub fn coalesce_key(event: &BusEvent) -> Option<(&str, &str)> {
    if event.channel != CHANNEL_PROGRESS {
        return None;
    }
    let id = event.payload.get("id")?.as_str()?;
    Some((event.channel.as_str(), id))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event(channel: &str, payload: serde_json::Value) -> BusEvent {
        BusEvent {
            id: "e".to_string(),
            seq: 0,
            channel: channel.to_string(),
            payload,
            created_at: String::new(),
        }
    }

    #[test]
    fn finished_progress_and_sound_flush_immediately() {
        assert!(should_flush_immediately(&event(CHANNEL_SOUND, json!({}))));
        assert!(should_flush_immediately(&event(
            CHANNEL_PROGRESS,
            json!({ "id": "j", "progress": 100.0, "finished": true })
        )));
        assert!(!should_flush_immediately(&event(
            CHANNEL_PROGRESS,
            json!({ "id": "j", "progress": 10.0, "finished": false })
        )));
        assert!(should_flush_immediately(&event(
            CHANNEL_PROGRESS,
            json!({ "id": "j", "cleared": true })
        )));
    }

    #[test]
    fn only_progress_events_coalesce() {
        let progress = event(CHANNEL_PROGRESS, json!({ "id": "j" }));
        assert_eq!(coalesce_key(&progress), Some((CHANNEL_PROGRESS, "j")));
        assert_eq!(coalesce_key(&event(CHANNEL_SOUND, json!({ "id": "j" }))), None);
    }
}
