use crate::domain::audit::AuditEvent;
use crate::domain::ports::{AuditStoreBox, EventSinkBox};
use crate::error::Result;
use tracing::{error, warn};

/// The audit trail: persist first, then best-effort broadcast.
///
/// Broadcast failure is caught, logged and swallowed; it must never fail the
/// originating business operation. Persistence failure propagates to the
/// caller, but only as a non-fatal side channel — the business transaction
/// has already committed by the time `record` runs.
pub struct AuditTrail {
    store: AuditStoreBox,
    sink: EventSinkBox,
}

impl AuditTrail {
    pub fn new(store: AuditStoreBox, sink: EventSinkBox) -> Self {
        Self { store, sink }
    }

    pub async fn record(&self, event: AuditEvent) -> Result<()> {
        self.store.append(event.clone()).await?;

        if let Err(err) = self.sink.publish(&event).await {
            warn!(
                kind = event.kind.as_str(),
                status = event.status.as_str(),
                error = %err,
                "audit broadcast failed"
            );
        }

        Ok(())
    }

    /// Record, logging (not propagating) a persistence failure. The engines
    /// use this so a broken audit store cannot undo committed balances.
    pub async fn record_or_log(&self, event: AuditEvent) {
        let kind = event.kind.as_str();
        if let Err(err) = self.record(event).await {
            error!(kind, error = %err, "failed to persist audit event");
        }
    }
}
