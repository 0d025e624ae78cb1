use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditKind {
    P2pTransfer,
    CashIn,
    CashoutRequest,
    CashoutResponse,
    CashoutComplete,
}

impl AuditKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditKind::P2pTransfer => "p2p_transfer",
            AuditKind::CashIn => "cash_in",
            AuditKind::CashoutRequest => "cashout_request",
            AuditKind::CashoutResponse => "cashout_response",
            AuditKind::CashoutComplete => "cashout_complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditStatus {
    Completed,
    Failed,
    Pending,
    Approved,
    Rejected,
}

impl AuditStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditStatus::Completed => "completed",
            AuditStatus::Failed => "failed",
            AuditStatus::Pending => "pending",
            AuditStatus::Approved => "approved",
            AuditStatus::Rejected => "rejected",
        }
    }
}

/// An append-only fact recording an attempted or completed money movement.
///
/// Fields are denormalized (phones, amounts, agent code) so the business
/// narrative can be reconstructed from the event alone. Never mutated after
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub kind: AuditKind,
    pub status: AuditStatus,
    pub occurred_at: DateTime<Utc>,
    pub actor_agent_id: Option<Uuid>,
    pub transaction_id: Option<Uuid>,
    pub cashout_request_id: Option<Uuid>,
    pub amount: Option<Decimal>,
    pub fee: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub transaction_ref: Option<String>,
    pub sender_phone: Option<String>,
    pub receiver_phone: Option<String>,
    pub agent_code: Option<String>,
    pub reason: Option<String>,
    pub data_json: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(kind: AuditKind, status: AuditStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            status,
            occurred_at: Utc::now(),
            actor_agent_id: None,
            transaction_id: None,
            cashout_request_id: None,
            amount: None,
            fee: None,
            commission: None,
            transaction_ref: None,
            sender_phone: None,
            receiver_phone: None,
            agent_code: None,
            reason: None,
            data_json: None,
        }
    }

    pub fn actor_agent(mut self, id: Uuid) -> Self {
        self.actor_agent_id = Some(id);
        self
    }

    pub fn transaction(mut self, id: Uuid) -> Self {
        self.transaction_id = Some(id);
        self
    }

    pub fn cashout_request(mut self, id: Uuid) -> Self {
        self.cashout_request_id = Some(id);
        self
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn fee(mut self, fee: Decimal) -> Self {
        self.fee = Some(fee);
        self
    }

    pub fn commission(mut self, commission: Decimal) -> Self {
        self.commission = Some(commission);
        self
    }

    pub fn transaction_ref(mut self, reference: &str) -> Self {
        self.transaction_ref = Some(reference.to_string());
        self
    }

    pub fn sender_phone(mut self, phone: &str) -> Self {
        self.sender_phone = Some(phone.to_string());
        self
    }

    pub fn receiver_phone(mut self, phone: &str) -> Self {
        self.receiver_phone = Some(phone.to_string());
        self
    }

    pub fn agent_code(mut self, code: &str) -> Self {
        self.agent_code = Some(code.to_string());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn data_json(mut self, value: serde_json::Value) -> Self {
        self.data_json = Some(value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_builder_fills_denormalized_fields() {
        let event = AuditEvent::new(AuditKind::P2pTransfer, AuditStatus::Failed)
            .amount(dec!(100))
            .fee(dec!(5))
            .sender_phone("+93700000001")
            .receiver_phone("+93700000002")
            .reason("Insufficient balance");

        assert_eq!(event.kind.as_str(), "p2p_transfer");
        assert_eq!(event.status.as_str(), "failed");
        assert_eq!(event.amount, Some(dec!(100)));
        assert_eq!(event.reason.as_deref(), Some("Insufficient balance"));
        assert!(event.transaction_id.is_none());
    }
}
