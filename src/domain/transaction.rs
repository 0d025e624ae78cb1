use crate::domain::reference::TransactionRef;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    P2pTransfer,
    CashIn,
    CashOut,
}

impl TransactionType {
    /// The fee-schedule key for this transaction type.
    pub fn fee_key(&self) -> &'static str {
        match self {
            TransactionType::P2pTransfer => "p2p_transfer",
            TransactionType::CashIn => "cash_in",
            TransactionType::CashOut => "cash_out",
        }
    }
}

/// The system commits synchronously; there are no partial or pending
/// transaction rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Completed,
}

/// An immutable record of a successful money movement. Created exactly once
/// per movement, never updated or deleted. At least one of sender, receiver
/// and agent is always set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub reference: TransactionRef,
    pub kind: TransactionType,
    pub sender_id: Option<Uuid>,
    pub receiver_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub amount: Decimal,
    pub fee: Decimal,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn involves_user(&self, user_id: Uuid) -> bool {
        self.sender_id == Some(user_id) || self.receiver_id == Some(user_id)
    }
}

/// The agent's share of a cash-out fee, recorded at completion. A
/// redistribution of already-collected fee, never newly minted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commission {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub transaction_id: Uuid,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Commission {
    pub fn new(agent_id: Uuid, transaction_id: Uuid, amount: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            transaction_id,
            amount,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_keys() {
        assert_eq!(TransactionType::P2pTransfer.fee_key(), "p2p_transfer");
        assert_eq!(TransactionType::CashIn.fee_key(), "cash_in");
        assert_eq!(TransactionType::CashOut.fee_key(), "cash_out");
    }
}
