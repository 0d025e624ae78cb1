use crate::domain::account::{AgentAccount, UserAccount};
use crate::domain::reference::TransactionRef;
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cash-out workflow states. The transition table in [`CashoutStatus::successors`]
/// is the single authority on which moves are legal; everything else is
/// rejected with `LedgerError::InvalidTransition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CashoutStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl CashoutStatus {
    pub fn successors(self) -> &'static [CashoutStatus] {
        match self {
            CashoutStatus::Pending => &[CashoutStatus::Approved, CashoutStatus::Rejected],
            CashoutStatus::Approved => &[CashoutStatus::Completed],
            CashoutStatus::Rejected | CashoutStatus::Completed => &[],
        }
    }

    pub fn can_transition_to(self, next: CashoutStatus) -> bool {
        self.successors().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CashoutStatus::Pending => "Pending",
            CashoutStatus::Approved => "Approved",
            CashoutStatus::Rejected => "Rejected",
            CashoutStatus::Completed => "Completed",
        }
    }
}

/// A two-party cash-out workflow entity. Created `Pending` with the user's
/// funds already escrowed; transitions exactly once through
/// `Approved -> Completed` or once to `Rejected`.
#[derive(Debug, Clone, PartialEq)]
pub struct CashoutRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub agent_code: String,
    pub agent_id: Uuid,
    pub amount: Decimal,
    pub fee: Decimal,
    pub status: CashoutStatus,
    pub requested_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub reference: TransactionRef,
}

impl CashoutRequest {
    pub fn new(
        user_id: Uuid,
        agent: &AgentAccount,
        amount: Decimal,
        fee: Decimal,
        reference: TransactionRef,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            agent_code: agent.agent_code.clone(),
            agent_id: agent.id,
            amount,
            fee,
            status: CashoutStatus::Pending,
            requested_at: now,
            responded_at: None,
            rejection_reason: None,
            reference,
        }
    }

    /// The full amount escrowed at creation and refunded on rejection.
    pub fn escrowed_total(&self) -> Decimal {
        self.amount + self.fee
    }

    fn transition(&mut self, next: CashoutStatus) -> Result<(), LedgerError> {
        if !self.status.can_transition_to(next) {
            return Err(LedgerError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.transition(CashoutStatus::Approved)?;
        self.responded_at = Some(now);
        Ok(())
    }

    pub fn reject(&mut self, reason: Option<String>, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.transition(CashoutStatus::Rejected)?;
        self.responded_at = Some(now);
        self.rejection_reason = reason;
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), LedgerError> {
        self.transition(CashoutStatus::Completed)
    }
}

/// Denormalized view of a request returned to callers and pushed to the
/// notification dispatcher. Carries the business narrative without requiring
/// a join back to account records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashoutSnapshot {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_phone: String,
    pub agent_code: String,
    pub agent_name: Option<String>,
    pub amount: Decimal,
    pub fee: Decimal,
    pub status: CashoutStatus,
    pub requested_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub transaction_ref: TransactionRef,
}

impl CashoutSnapshot {
    pub fn of(
        request: &CashoutRequest,
        user: Option<&UserAccount>,
        agent_user: Option<&UserAccount>,
    ) -> Self {
        Self {
            id: request.id,
            user_id: request.user_id,
            user_name: user.map(|u| u.full_name.clone()).unwrap_or_default(),
            user_phone: user.map(|u| u.phone_number.clone()).unwrap_or_default(),
            agent_code: request.agent_code.clone(),
            agent_name: agent_user.map(|u| u.full_name.clone()),
            amount: request.amount,
            fee: request.fee,
            status: request.status,
            requested_at: request.requested_at,
            responded_at: request.responded_at,
            rejection_reason: request.rejection_reason.clone(),
            transaction_ref: request.reference.clone(),
        }
    }
}
