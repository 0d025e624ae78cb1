use crate::domain::cashout::CashoutStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Every failure an engine operation can surface to its caller.
///
/// Validation and insufficient-funds failures are part of the business
/// contract: they are returned as values, paired with an audit event, and
/// never mutate any balance. `LockTimeout` is the only retryable variant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Sender not found")]
    SenderNotFound,
    #[error("Receiver not found")]
    ReceiverNotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("Customer not found")]
    CustomerNotFound,
    #[error("Agent not found")]
    AgentNotFound,
    #[error("Invalid agent code")]
    InvalidAgentCode,
    #[error("Agent is not active")]
    AgentNotActive,
    #[error("Invalid PIN")]
    InvalidPin,
    #[error("Cannot transfer to self")]
    SelfTransfer,
    #[error("Insufficient balance")]
    InsufficientBalance,
    #[error("Agent has insufficient float balance")]
    InsufficientFloat,
    #[error("Amount must be positive")]
    NonPositiveAmount,
    #[error("Cash-out request not found")]
    RequestNotFound,
    #[error("Cash-out request already responded to")]
    AlreadyResponded,
    #[error("Cash-out request is not approved yet")]
    NotApproved,
    #[error("Invalid cash-out transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: CashoutStatus,
        to: CashoutStatus,
    },
    #[error("Ledger busy: lock acquisition timed out")]
    LockTimeout,
    #[error("Audit store failure: {0}")]
    AuditStore(String),
}

impl LedgerError {
    /// Callers may retry the operation verbatim only for these variants.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::LockTimeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_lock_timeout_is_retryable() {
        assert!(LedgerError::LockTimeout.is_retryable());
        assert!(!LedgerError::InsufficientBalance.is_retryable());
        assert!(!LedgerError::InvalidPin.is_retryable());
    }

    #[test]
    fn test_messages_are_caller_facing() {
        assert_eq!(LedgerError::InvalidPin.to_string(), "Invalid PIN");
        assert_eq!(
            LedgerError::InsufficientFloat.to_string(),
            "Agent has insufficient float balance"
        );
    }
}
