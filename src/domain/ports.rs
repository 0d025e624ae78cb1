use crate::domain::audit::AuditEvent;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Durable, append-only persistence for audit events. Must tolerate being
/// called after the originating business transaction has committed.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, event: AuditEvent) -> Result<()>;
    async fn events(&self) -> Result<Vec<AuditEvent>>;
}

/// Best-effort broadcast of persisted audit events to observers (e.g. an
/// admin dashboard). A failing sink must never fail the business operation.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: &AuditEvent) -> Result<()>;
}

/// Outbound real-time delivery, addressed by a routing key (an agent code,
/// or `USER_{id}`). At-most-once, best effort.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, route: &str, event: &str, payload: serde_json::Value) -> Result<()>;
}

pub type AuditStoreBox = Box<dyn AuditStore>;
pub type EventSinkBox = Box<dyn EventSink>;
pub type NotificationDispatcherArc = Arc<dyn NotificationDispatcher>;
