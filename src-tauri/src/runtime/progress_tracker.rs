//! Per-consumer view of one job's progress.
//!
//! A tracker registers with the hub before fetching the currently recorded
//! item, so an event emitted between the two is never lost; the fetched
//! snapshot only applies when no live event got there first. Updates are
//! last-event-wins: events carry no sequence numbers, so a reordered or
//! duplicated delivery is applied as-is.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::progress::{ProgressError, ProgressItem, ProgressRegistry};
use super::progress_hub::{ProgressHub, ProgressSubscription};

/// Backend operations a tracker needs besides the event stream.
#[async_trait]
pub trait ProgressSource: Send + Sync {
    async fn get_progress(&self, id: &str) -> Result<Option<ProgressItem>, ProgressError>;
    async fn clear_progress(&self, id: &str) -> Result<(), ProgressError>;
}

#[async_trait]
impl ProgressSource for ProgressRegistry {
    async fn get_progress(&self, id: &str) -> Result<Option<ProgressItem>, ProgressError> {
        Ok(self.get(id))
    }

    async fn clear_progress(&self, id: &str) -> Result<(), ProgressError> {
        self.clear(id);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressState {
    pub progress: f64,
    pub finished: bool,
}

impl From<ProgressItem> for ProgressState {
    fn from(item: ProgressItem) -> Self {
        Self {
            progress: item.progress,
            finished: item.finished,
        }
    }
}

pub struct ProgressTracker {
    subscription: ProgressSubscription,
    hub: ProgressHub,
    source: Arc<dyn ProgressSource>,
}

impl ProgressTracker {
    pub async fn subscribe(
        id: impl Into<String>,
        hub: &ProgressHub,
        source: Arc<dyn ProgressSource>,
    ) -> Result<Self, ProgressError> {
        let id = id.into();
        let subscription = hub.register(&id);
        if let Some(item) = source.get_progress(&id).await? {
            hub.seed(item);
        }
        Ok(Self {
            subscription,
            hub: hub.clone(),
            source,
        })
    }

    pub fn id(&self) -> &str {
        self.subscription.id()
    }

    /// Latest known progress, `None` when nothing is known.
    pub fn state(&self) -> Option<ProgressState> {
        self.subscription.current().map(ProgressState::from)
    }

    /// Known and not yet finished.
    pub fn is_active(&self) -> bool {
        self.state().is_some_and(|state| !state.finished)
    }

    pub async fn changed(&mut self) -> Option<ProgressState> {
        self.subscription.changed().await.map(ProgressState::from)
    }

    /// Follow a different job. The old subscription is released once the new
    /// one is in place.
    pub async fn switch_to(&mut self, id: impl Into<String>) -> Result<(), ProgressError> {
        let next = Self::subscribe(id, &self.hub, Arc::clone(&self.source)).await?;
        *self = next;
        Ok(())
    }

    /// Ask the backend to discard the item, then forget it locally. Updates
    /// still in flight on the bus are followed by the backend's cleared
    /// event, which resets the slot again.
    pub async fn clear(&self) -> Result<(), ProgressError> {
        self.source.clear_progress(self.id()).await?;
        self.hub.reset(self.id());
        Ok(())
    }
}
