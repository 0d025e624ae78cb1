pub mod audit;
pub mod cashout;
pub mod ledger;

use crate::application::audit::AuditTrail;
use crate::domain::audit::{AuditEvent, AuditKind, AuditStatus};
use crate::error::{LedgerError, Result};

/// One business operation evaluated inside the unit of work: either a
/// committed receipt or a business failure, each paired with the single audit
/// event describing it. Failure outcomes are produced before any state
/// mutation, so discarding the draft loses nothing.
pub(crate) enum Outcome<R> {
    Committed { receipt: R, event: AuditEvent },
    Failed { error: LedgerError, event: AuditEvent },
}

/// Records the outcome's audit event and converts it into the caller-facing
/// result. Audit persistence happens after the unit of work has committed and
/// never rolls it back.
pub(crate) async fn settle<R>(audit: &AuditTrail, outcome: Outcome<R>) -> Result<R> {
    match outcome {
        Outcome::Committed { receipt, event } => {
            audit.record_or_log(event).await;
            Ok(receipt)
        }
        Outcome::Failed { error, event } => {
            audit.record_or_log(event).await;
            Err(error)
        }
    }
}

/// Infrastructure failures (lock timeout, aborted unit of work) still get an
/// audit event describing the exception before the error surfaces.
pub(crate) async fn record_infra_failure(audit: &AuditTrail, kind: AuditKind, err: &LedgerError) {
    audit
        .record_or_log(AuditEvent::new(kind, AuditStatus::Failed).reason(err.to_string()))
        .await;
}
