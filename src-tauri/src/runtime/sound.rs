//! Move sounds.
//!
//! One `SoundPlayer` per process, owned by `AppState`. Calls arriving within
//! 75ms of the last accepted one are dropped outright, which keeps engine
//! lines and bulk navigation from stacking clips on top of each other.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bus::event_types::CHANNEL_SOUND;
use crate::bus::EventBus;
use crate::core::preferences::Preferences;
use crate::storage::StorageError;

pub const MIN_SOUND_INTERVAL: Duration = Duration::from_millis(75);

#[derive(Debug, Error)]
pub enum SoundError {
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("failed to encode sound cue: {0}")]
    Encode(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock> Clock for Arc<C> {
    fn now(&self) -> Instant {
        self.as_ref().now()
    }
}

/// Accepts at most one call per `interval`; rejected calls do not move the
/// window.
pub struct RateLimiter<C> {
    clock: C,
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(clock: C, interval: Duration) -> Self {
        Self {
            clock,
            interval,
            last: Mutex::new(None),
        }
    }

    pub fn try_acquire(&self) -> bool {
        let now = self.clock.now();
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = *last {
            if now.saturating_duration_since(previous) < self.interval {
                return false;
            }
        }
        *last = Some(now);
        true
    }
}

// ---------------------------------------------------------------------------
// Cues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundKind {
    Move,
    Capture,
    Check,
}

impl SoundKind {
    /// Check takes priority over capture.
    pub fn classify(capture: bool, check: bool) -> Self {
        if check {
            SoundKind::Check
        } else if capture {
            SoundKind::Capture
        } else {
            SoundKind::Move
        }
    }

    pub const fn file_stem(self) -> &'static str {
        match self {
            SoundKind::Move => "Move",
            SoundKind::Capture => "Capture",
            SoundKind::Check => "Check",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundCue {
    pub collection: String,
    pub kind: SoundKind,
    /// Asset path relative to the webview root.
    pub path: String,
    pub volume: f64,
}

impl SoundCue {
    pub fn new(collection: impl Into<String>, kind: SoundKind, volume: f64) -> Self {
        let collection = collection.into();
        let path = format!("sound/{collection}/{}.mp3", kind.file_stem());
        Self {
            collection,
            kind,
            path,
            volume,
        }
    }
}

pub trait SoundSink: Send + Sync {
    fn play(&self, cue: &SoundCue) -> Result<(), SoundError>;
}

/// Hands cues to the webview over the `sound` channel.
pub struct BusSoundSink {
    bus: Arc<EventBus>,
}

impl BusSoundSink {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl SoundSink for BusSoundSink {
    fn play(&self, cue: &SoundCue) -> Result<(), SoundError> {
        self.bus.emit(CHANNEL_SOUND, serde_json::to_value(cue)?);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

pub struct SoundPlayer<C = SystemClock> {
    limiter: RateLimiter<C>,
    preferences: Arc<Preferences>,
    sink: Arc<dyn SoundSink>,
}

impl SoundPlayer<SystemClock> {
    pub fn new(preferences: Arc<Preferences>, sink: Arc<dyn SoundSink>) -> Self {
        Self::with_clock(SystemClock, preferences, sink)
    }
}

impl<C: Clock> SoundPlayer<C> {
    pub fn with_clock(clock: C, preferences: Arc<Preferences>, sink: Arc<dyn SoundSink>) -> Self {
        Self {
            limiter: RateLimiter::new(clock, MIN_SOUND_INTERVAL),
            preferences,
            sink,
        }
    }

    /// Play the clip for a move. Returns the dispatched cue, or `None` when
    /// throttled or muted.
    pub fn play(&self, capture: bool, check: bool) -> Result<Option<SoundCue>, SoundError> {
        if !self.limiter.try_acquire() {
            tracing::trace!("sound throttled");
            return Ok(None);
        }

        let settings = self.preferences.sound()?;
        if settings.volume <= 0.0 {
            return Ok(None);
        }

        let cue = SoundCue::new(settings.collection, SoundKind::classify(capture, check), settings.volume);
        self.sink.play(&cue)?;
        Ok(Some(cue))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::core::preferences::PreferenceKey;
    use crate::testing::{ManualClock, RecordingSink, TestPreferences};

    #[test]
    fn limiter_drops_calls_inside_the_window() {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::new(clock.clone(), MIN_SOUND_INTERVAL);

        assert!(limiter.try_acquire());
        clock.advance(Duration::from_millis(50));
        assert!(!limiter.try_acquire());
        clock.advance(Duration::from_millis(26));
        assert!(limiter.try_acquire());
    }

    #[test]
    fn rejected_calls_do_not_extend_the_window() {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::new(clock.clone(), MIN_SOUND_INTERVAL);

        assert!(limiter.try_acquire());
        for _ in 0..7 {
            clock.advance(Duration::from_millis(10));
            assert!(!limiter.try_acquire());
        }
        clock.advance(Duration::from_millis(5));
        assert!(limiter.try_acquire());
    }

    #[test]
    fn check_beats_capture() {
        assert_eq!(SoundKind::classify(false, false), SoundKind::Move);
        assert_eq!(SoundKind::classify(true, false), SoundKind::Capture);
        assert_eq!(SoundKind::classify(true, true), SoundKind::Check);
    }

    #[test]
    fn cue_points_at_collection_asset() {
        let cue = SoundCue::new("piano", SoundKind::Capture, 0.5);
        assert_eq!(cue.path, "sound/piano/Capture.mp3");
    }

    #[tokio::test]
    async fn player_uses_stored_settings_and_throttles() {
        let prefs = TestPreferences::new();
        prefs
            .preferences
            .set(
                PreferenceKey::Sound,
                serde_json::json!({ "collection": "nes", "volume": 0.4 }),
            )
            .await
            .unwrap();
        let clock = Arc::new(ManualClock::new());
        let sink = Arc::new(RecordingSink::default());
        let player = SoundPlayer::with_clock(clock.clone(), prefs.preferences.clone(), sink.clone());

        let first = player.play(true, false).unwrap();
        clock.advance(Duration::from_millis(50));
        let second = player.play(false, false).unwrap();
        clock.advance(Duration::from_millis(26));
        let third = player.play(false, true).unwrap();

        assert_eq!(first, Some(SoundCue::new("nes", SoundKind::Capture, 0.4)));
        assert_eq!(second, None);
        assert_eq!(third.map(|cue| cue.kind), Some(SoundKind::Check));
        assert_eq!(sink.played().len(), 2);
    }

    #[tokio::test]
    async fn muted_volume_plays_nothing() {
        let prefs = TestPreferences::new();
        prefs
            .preferences
            .set(
                PreferenceKey::Sound,
                serde_json::json!({ "collection": "standard", "volume": 0.0 }),
            )
            .await
            .unwrap();
        let sink = Arc::new(RecordingSink::default());
        let player = SoundPlayer::new(prefs.preferences.clone(), sink.clone());

        assert_eq!(player.play(false, false).unwrap(), None);
        assert!(sink.played().is_empty());
    }

    #[tokio::test]
    async fn bus_sink_emits_on_sound_channel() {
        let bus = Arc::new(EventBus::new());
        let mut rx = bus.subscribe();
        let sink = BusSoundSink::new(bus);

        sink.play(&SoundCue::new("standard", SoundKind::Move, 0.8)).unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.channel, CHANNEL_SOUND);
        assert_eq!(event.payload["path"], "sound/standard/Move.mp3");
    }
}
