//! Object change subscriptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

/// Kind of the object that changed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    TransportOrder,
    OrderSequence,
    Vehicle,
    Path,
    Point,
}

/// Type of object change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Object created.
    Created,
    /// Existing object updated.
    Updated,
    /// Object removed.
    Removed,
}

/// An object change event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectChangeEvent {
    pub kind: ObjectKind,

    /// Name of the object that changed.
    pub name: String,

    pub change_type: ChangeType,

    pub timestamp: DateTime<Utc>,
}

impl ObjectChangeEvent {
    pub fn new(kind: ObjectKind, name: impl Into<String>, change_type: ChangeType) -> Self {
        Self {
            kind,
            name: name.into(),
            change_type,
            timestamp: Utc::now(),
        }
    }
}

/// Filter for subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionFilter {
    /// Object kinds to watch.
    pub kinds: Option<Vec<ObjectKind>>,

    /// Specific object names to watch.
    pub names: Option<Vec<String>>,

    /// Change types to watch.
    pub change_types: Option<Vec<ChangeType>>,
}

impl SubscriptionFilter {
    /// Create a filter for one object kind.
    pub fn kind(kind: ObjectKind) -> Self {
        Self {
            kinds: Some(vec![kind]),
            ..Default::default()
        }
    }

    /// Create a filter for specific object names.
    pub fn names(names: Vec<String>) -> Self {
        Self {
            names: Some(names),
            ..Default::default()
        }
    }

    /// Check if an event matches this filter.
    pub fn matches(&self, event: &ObjectChangeEvent) -> bool {
        if let Some(ref kinds) = self.kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }

        if let Some(ref names) = self.names {
            if !names.contains(&event.name) {
                return false;
            }
        }

        if let Some(ref types) = self.change_types {
            if !types.contains(&event.change_type) {
                return false;
            }
        }

        true
    }
}

/// A subscription to object changes.
pub struct ObjectSubscription {
    /// Unique ID for this subscription.
    pub id: Uuid,

    pub filter: SubscriptionFilter,

    receiver: broadcast::Receiver<ObjectChangeEvent>,
}

impl ObjectSubscription {
    /// Wait for the next event matching the filter.
    ///
    /// Returns `None` once the publishing side is gone.
    pub async fn next(&mut self) -> Option<ObjectChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Subscription {} lagged, skipped {} events", self.id, skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next matching event if one is already queued.
    pub fn try_next(&mut self) -> Option<ObjectChangeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

/// Manager for object change subscriptions.
///
/// Dropping an [`ObjectSubscription`] ends it.
pub struct SubscriptionManager {
    sender: broadcast::Sender<ObjectChangeEvent>,
}

impl SubscriptionManager {
    /// Create a new subscription manager.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1000);
        Self { sender }
    }

    /// Subscribe to object changes with a filter.
    pub fn subscribe(&self, filter: SubscriptionFilter) -> ObjectSubscription {
        ObjectSubscription {
            id: Uuid::new_v4(),
            filter,
            receiver: self.sender.subscribe(),
        }
    }

    /// Publish an object change event.
    pub fn publish(&self, event: ObjectChangeEvent) {
        // No receivers is not an error.
        let _ = self.sender.send(event);
    }

    /// Get the number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
