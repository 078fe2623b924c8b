//! Progress registry for long-running backend jobs.
//!
//! Jobs report `{ id, progress, finished }` here; every report is stored
//! (latest wins) and published on the `progress` bus channel. Items stay
//! until explicitly cleared, including finished ones. Clearing publishes
//! `{ id, cleared: true }` on the same channel, so observers see it after
//! every update that was emitted before it.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::bus::event_types::CHANNEL_PROGRESS;
use crate::bus::EventBus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressItem {
    pub id: String,
    /// Percent complete, 0..=100.
    pub progress: f64,
    pub finished: bool,
}

/// Payload of a `progress` channel event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressEvent {
    Cleared { id: String, cleared: bool },
    Update(ProgressItem),
}

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("progress for {id} is not a finite number")]
    NonFinite { id: String },
}

pub struct ProgressRegistry {
    items: DashMap<String, ProgressItem>,
    bus: Arc<EventBus>,
}

impl ProgressRegistry {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            items: DashMap::new(),
            bus,
        }
    }

    /// Allocate an id for a new job. Nothing is recorded until it reports.
    pub fn start_job(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Record and publish the latest progress for `id`, clamped to 0..=100.
    pub fn report(&self, id: &str, progress: f64, finished: bool) -> Result<ProgressItem, ProgressError> {
        if !progress.is_finite() {
            return Err(ProgressError::NonFinite { id: id.to_string() });
        }
        let item = ProgressItem {
            id: id.to_string(),
            progress: progress.clamp(0.0, 100.0),
            finished,
        };
        // Publish while the entry is held so bus order matches map order.
        let entry = self.items.entry(item.id.clone()).insert(item.clone());
        self.publish(&ProgressEvent::Update(item.clone()));
        drop(entry);

        if finished {
            tracing::debug!("job {id} finished");
        }
        Ok(item)
    }

    pub fn get(&self, id: &str) -> Option<ProgressItem> {
        self.items.get(id).map(|entry| entry.value().clone())
    }

    /// Drop the item and tell observers to forget it. Returns true when an
    /// item was removed.
    pub fn clear(&self, id: &str) -> bool {
        let cleared = ProgressEvent::Cleared {
            id: id.to_string(),
            cleared: true,
        };
        match self.items.entry(id.to_string()) {
            Entry::Occupied(entry) => {
                self.publish(&cleared);
                entry.remove();
                true
            }
            Entry::Vacant(_entry) => {
                self.publish(&cleared);
                false
            }
        }
    }

    pub fn list(&self) -> Vec<ProgressItem> {
        let mut items: Vec<ProgressItem> = self.items.iter().map(|e| e.value().clone()).collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }

    fn publish(&self, event: &ProgressEvent) {
        match serde_json::to_value(event) {
            Ok(payload) => {
                self.bus.emit(CHANNEL_PROGRESS, payload);
            }
            Err(e) => tracing::warn!("failed to encode progress event: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn reports_are_stored_and_published() {
        let bus = Arc::new(EventBus::new());
        let mut rx = bus.subscribe();
        let registry = ProgressRegistry::new(bus);

        registry.report("job-1", 40.0, false).unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.channel, CHANNEL_PROGRESS);
        let item: ProgressItem = serde_json::from_value(event.payload).unwrap();
        assert_eq!(registry.get("job-1"), Some(item));
    }

    #[test]
    fn progress_is_clamped_and_nan_rejected() {
        let registry = ProgressRegistry::new(Arc::new(EventBus::new()));

        assert_eq!(registry.report("a", 140.0, false).unwrap().progress, 100.0);
        assert_eq!(registry.report("a", -3.0, false).unwrap().progress, 0.0);
        assert!(matches!(
            registry.report("a", f64::NAN, false),
            Err(ProgressError::NonFinite { .. })
        ));
    }

    #[test]
    fn finished_items_stay_until_cleared() {
        let registry = ProgressRegistry::new(Arc::new(EventBus::new()));
        let id = registry.start_job();

        registry.report(&id, 50.0, false).unwrap();
        registry.report(&id, 100.0, true).unwrap();

        assert_eq!(
            registry.get(&id),
            Some(ProgressItem {
                id: id.clone(),
                progress: 100.0,
                finished: true,
            })
        );
        assert!(registry.clear(&id));
        assert!(!registry.clear(&id));
        assert!(registry.get(&id).is_none());
    }

    #[tokio::test]
    async fn clearing_is_published_after_earlier_updates() {
        let bus = Arc::new(EventBus::new());
        let mut rx = bus.subscribe();
        let registry = ProgressRegistry::new(bus);

        registry.report("job-1", 40.0, false).unwrap();
        assert!(registry.clear("job-1"));

        let first: ProgressEvent = serde_json::from_value(rx.recv().await.unwrap().payload).unwrap();
        let second: ProgressEvent = serde_json::from_value(rx.recv().await.unwrap().payload).unwrap();
        assert!(matches!(first, ProgressEvent::Update(item) if item.progress == 40.0));
        assert_eq!(
            second,
            ProgressEvent::Cleared {
                id: "job-1".to_string(),
                cleared: true,
            }
        );
    }

    #[test]
    fn list_is_sorted_by_id() {
        let registry = ProgressRegistry::new(Arc::new(EventBus::new()));
        registry.report("b", 1.0, false).unwrap();
        registry.report("a", 2.0, false).unwrap();

        let ids: Vec<String> = registry.list().into_iter().map(|item| item.id).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }
}
