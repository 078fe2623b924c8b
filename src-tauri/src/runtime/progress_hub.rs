//! Demultiplexes the shared `progress` channel into per-job observers.
//!
//! One consumer task decodes each progress event once and routes it to the
//! watch slot registered for its id. Slots are reference counted: the last
//! `ProgressSubscription` for an id to drop removes the slot, so events for
//! an id nobody observes are discarded. A cleared event resets the slot in
//! bus order, after any update emitted before the clear.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{broadcast, watch};

use super::progress::{ProgressEvent, ProgressItem};
use crate::bus::event_types::CHANNEL_PROGRESS;
use crate::bus::BusEvent;

struct Slot {
    tx: watch::Sender<Option<ProgressItem>>,
    observers: usize,
}

#[derive(Default)]
struct HubInner {
    slots: DashMap<String, Slot>,
}

impl HubInner {
    fn unregister(&self, id: &str) {
        if let Entry::Occupied(mut entry) = self.slots.entry(id.to_string()) {
            let slot = entry.get_mut();
            slot.observers = slot.observers.saturating_sub(1);
            if slot.observers == 0 {
                entry.remove();
                tracing::trace!("progress slot {id} released");
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct ProgressHub {
    inner: Arc<HubInner>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for `id`. Dropping the returned subscription
    /// unregisters it.
    pub fn register(&self, id: &str) -> ProgressSubscription {
        let rx = match self.inner.slots.entry(id.to_string()) {
            Entry::Occupied(mut entry) => {
                let slot = entry.get_mut();
                slot.observers += 1;
                slot.tx.subscribe()
            }
            Entry::Vacant(entry) => {
                let (tx, rx) = watch::channel(None);
                entry.insert(Slot { tx, observers: 1 });
                rx
            }
        };
        ProgressSubscription {
            id: id.to_string(),
            rx,
            hub: Arc::clone(&self.inner),
        }
    }

    /// Number of ids with at least one observer.
    #[cfg(test)]
    pub fn observed_ids(&self) -> usize {
        self.inner.slots.len()
    }

    /// Route one bus event. Non-progress channels and unobserved ids are
    /// ignored; the payload is decoded at most once.
    pub fn dispatch(&self, event: &BusEvent) {
        if event.channel != CHANNEL_PROGRESS {
            return;
        }
        match serde_json::from_value::<ProgressEvent>(event.payload.clone()) {
            Ok(ProgressEvent::Update(item)) => {
                if let Some(slot) = self.inner.slots.get(&item.id) {
                    slot.tx.send_replace(Some(item));
                }
            }
            Ok(ProgressEvent::Cleared { id, cleared: true }) => self.reset(&id),
            Ok(ProgressEvent::Cleared { .. }) => {}
            Err(e) => tracing::warn!("dropping malformed progress event {}: {e}", event.id),
        }
    }

    /// Apply a fetched snapshot unless a live event already arrived.
    pub fn seed(&self, item: ProgressItem) {
        if let Some(slot) = self.inner.slots.get(&item.id) {
            slot.tx.send_if_modified(|current| {
                if current.is_some() {
                    return false;
                }
                *current = Some(item);
                true
            });
        }
    }

    /// Forget what is known about `id` for all of its observers.
    pub fn reset(&self, id: &str) {
        if let Some(slot) = self.inner.slots.get(id) {
            slot.tx.send_replace(None);
        }
    }

    /// Consume bus events until the bus closes.
    pub fn spawn_consumer(
        &self,
        mut rx: broadcast::Receiver<BusEvent>,
    ) -> tauri::async_runtime::JoinHandle<()> {
        let hub = self.clone();
        tauri::async_runtime::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => hub.dispatch(&event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("progress hub lagged, dropped {n} events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("progress hub stopped");
        })
    }
}

/// Observer registration for one job id.
pub struct ProgressSubscription {
    id: String,
    rx: watch::Receiver<Option<ProgressItem>>,
    hub: Arc<HubInner>,
}

impl ProgressSubscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn current(&self) -> Option<ProgressItem> {
        self.rx.borrow().clone()
    }

    /// Wait for the next update. The slot's sender lives at least as long as
    /// this subscription, so the wait only ends on a new value.
    pub async fn changed(&mut self) -> Option<ProgressItem> {
        let _ = self.rx.changed().await;
        self.rx.borrow_and_update().clone()
    }
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        self.hub.unregister(&self.id);
    }
}
