//! In-process fan-out of live alert cues
//!
//! Fire-and-forget: an event reaches the subscribers registered at publish
//! time and nobody else. Nothing is queued beyond each subscriber's small
//! channel buffer and nothing is persisted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Events buffered per subscriber before it counts as stalled
pub const SUBSCRIBER_BUFFER: usize = 32;

/// A director cue, e.g. `{type: "structure", message: "CORO", color: "blue"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(rename = "color")]
    pub accent: String,
}

impl AlertEvent {
    pub fn new(
        kind: impl Into<String>,
        message: impl Into<String>,
        accent: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            accent: accent.into(),
        }
    }
}

/// Token identifying one registered subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A live subscriber's end of the channel
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    receiver: mpsc::Receiver<AlertEvent>,
}

impl Subscription {
    /// Next event, or `None` once unsubscribed
    pub async fn recv(&mut self) -> Option<AlertEvent> {
        self.receiver.recv().await
    }

    /// Next event if one is already waiting
    pub fn try_recv(&mut self) -> Option<AlertEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Outcome of one publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Debug)]
enum DeliveryFailure {
    /// Receiver dropped without unsubscribing
    Gone,
    /// Receiver not draining its buffer
    Stalled,
}

/// Publish/subscribe hub. Cloning shares the same subscriber set.
#[derive(Debug, Clone, Default)]
pub struct AlertBroadcaster {
    subscribers: Arc<Mutex<HashMap<SubscriberId, mpsc::Sender<AlertEvent>>>>,
}

impl AlertBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribers(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<AlertEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new live channel.
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId(Uuid::new_v4());
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.subscribers().insert(id, sender);
        tracing::debug!(subscriber = %id, "alert subscriber connected");
        Subscription { id, receiver }
    }

    /// Remove a channel. Unknown or already-removed ids are a no-op.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers().remove(&id).is_some();
        if removed {
            tracing::debug!(subscriber = %id, "alert subscriber disconnected");
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    /// Deliver `event` to every currently registered subscriber.
    ///
    /// Each delivery is independent: a stale or stalled subscriber is
    /// skipped and counted, never reported to the publisher as an error.
    pub fn publish(&self, event: &AlertEvent) -> DeliveryReport {
        let targets: Vec<_> = self
            .subscribers()
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();

        let mut report = DeliveryReport::default();
        for (id, sender) in targets {
            match deliver(&sender, event) {
                Ok(()) => report.delivered += 1,
                Err(failure) => {
                    tracing::debug!(subscriber = %id, ?failure, "alert not delivered");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            kind = %event.kind,
            message = %event.message,
            delivered = report.delivered,
            failed = report.failed,
            "alert broadcast"
        );
        report
    }
}

fn deliver(sender: &mpsc::Sender<AlertEvent>, event: &AlertEvent) -> Result<(), DeliveryFailure> {
    sender.try_send(event.clone()).map_err(|err| match err {
        TrySendError::Closed(_) => DeliveryFailure::Gone,
        TrySendError::Full(_) => DeliveryFailure::Stalled,
    })
}
