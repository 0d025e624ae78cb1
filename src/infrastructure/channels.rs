use crate::domain::audit::AuditEvent;
use crate::domain::ports::{EventSink, NotificationDispatcher};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// Fan-out of persisted audit events over a tokio broadcast channel.
///
/// Observers subscribe for a receiver; publishing with no subscribers is not
/// an error (delivery is best effort by contract).
#[derive(Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<AuditEvent>,
}

impl BroadcastSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for BroadcastSink {
    async fn publish(&self, event: &AuditEvent) -> Result<()> {
        let _ = self.tx.send(event.clone());
        Ok(())
    }
}

/// A routed notification as handed to the delivery layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub route: String,
    pub event: String,
    pub payload: serde_json::Value,
}

/// Channel-backed notification dispatcher: the real-time delivery layer
/// subscribes and forwards; dropped messages are acceptable, ledger
/// correctness never depends on them.
#[derive(Clone)]
pub struct ChannelDispatcher {
    tx: broadcast::Sender<Notification>,
}

impl ChannelDispatcher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Default for ChannelDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationDispatcher for ChannelDispatcher {
    async fn dispatch(&self, route: &str, event: &str, payload: serde_json::Value) -> Result<()> {
        let _ = self.tx.send(Notification {
            route: route.to_string(),
            event: event.to_string(),
            payload,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audit::{AuditKind, AuditStatus};
    use serde_json::json;

    #[tokio::test]
    async fn test_broadcast_reaches_subscriber() {
        let sink = BroadcastSink::new();
        let mut rx = sink.subscribe();

        let event = AuditEvent::new(AuditKind::CashIn, AuditStatus::Completed);
        sink.publish(&event).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, event.id);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let sink = BroadcastSink::new();
        let event = AuditEvent::new(AuditKind::CashIn, AuditStatus::Failed);
        assert!(sink.publish(&event).await.is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_routes_payload() {
        let dispatcher = ChannelDispatcher::new();
        let mut rx = dispatcher.subscribe();

        dispatcher
            .dispatch("AGT001", "cashout:requested", json!({"amount": "200"}))
            .await
            .unwrap();

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.route, "AGT001");
        assert_eq!(notification.event, "cashout:requested");
        assert_eq!(notification.payload["amount"], "200");
    }
}
