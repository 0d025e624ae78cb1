use crate::application::audit::AuditTrail;
use crate::application::{Outcome, record_infra_failure, settle};
use crate::domain::account::{Amount, Balance};
use crate::domain::audit::{AuditEvent, AuditKind, AuditStatus};
use crate::domain::fee::calculate_fee;
use crate::domain::reference::TransactionRef;
use crate::domain::transaction::{Transaction, TransactionStatus, TransactionType};
use crate::error::{LedgerError, Result};
use crate::infrastructure::in_memory::{InMemoryLedger, LedgerState};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    pub transaction_ref: TransactionRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CashInReceipt {
    pub transaction_ref: TransactionRef,
    pub new_float_balance: Balance,
}

/// Executes P2P transfers and cash-ins as atomic balance mutations plus
/// transaction records. Every outcome, success or failure, produces exactly
/// one audit event.
#[derive(Clone)]
pub struct LedgerEngine {
    store: InMemoryLedger,
    audit: Arc<AuditTrail>,
}

impl LedgerEngine {
    pub fn new(store: InMemoryLedger, audit: Arc<AuditTrail>) -> Self {
        Self { store, audit }
    }

    /// Peer-to-peer transfer: debit sender `amount + fee`, credit receiver
    /// `amount`. The fee is retained by the platform and credited nowhere.
    pub async fn transfer_p2p(
        &self,
        sender_id: Uuid,
        receiver_phone: &str,
        amount: Amount,
        pin: &str,
    ) -> Result<TransferReceipt> {
        let outcome = match self
            .store
            .with_transaction(|state| apply_transfer(state, sender_id, receiver_phone, amount, pin))
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                record_infra_failure(&self.audit, AuditKind::P2pTransfer, &err).await;
                return Err(err);
            }
        };

        let receipt = settle(&self.audit, outcome).await?;
        info!(reference = %receipt.transaction_ref, amount = %amount.value(), "p2p transfer completed");
        Ok(receipt)
    }

    /// Agent-assisted cash-in: move `amount` from the agent's float into the
    /// customer's balance, fee-free.
    pub async fn cash_in(
        &self,
        agent_id: Uuid,
        customer_phone: &str,
        amount: Amount,
    ) -> Result<CashInReceipt> {
        let outcome = match self
            .store
            .with_transaction(|state| apply_cash_in(state, agent_id, customer_phone, amount))
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                record_infra_failure(&self.audit, AuditKind::CashIn, &err).await;
                return Err(err);
            }
        };

        let receipt = settle(&self.audit, outcome).await?;
        info!(reference = %receipt.transaction_ref, amount = %amount.value(), "cash-in completed");
        Ok(receipt)
    }

    /// Most recent transactions the user sent or received, newest first.
    pub async fn user_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>> {
        self.store
            .read(|state| {
                state.transactions_where(|t| t.involves_user(user_id), DEFAULT_HISTORY_LIMIT)
            })
            .await
    }

    /// Most recent transactions handled by the agent, newest first.
    pub async fn agent_transactions(&self, agent_id: Uuid) -> Result<Vec<Transaction>> {
        self.store
            .read(|state| {
                state.transactions_where(|t| t.agent_id == Some(agent_id), DEFAULT_HISTORY_LIMIT)
            })
            .await
    }
}

fn apply_transfer(
    state: &mut LedgerState,
    sender_id: Uuid,
    receiver_phone: &str,
    amount: Amount,
    pin: &str,
) -> Result<Outcome<TransferReceipt>> {
    let now = Utc::now();
    let base = || {
        AuditEvent::new(AuditKind::P2pTransfer, AuditStatus::Failed)
            .amount(amount.value())
            .receiver_phone(receiver_phone)
    };

    let Some(sender) = state.user(sender_id) else {
        return Ok(Outcome::Failed {
            error: LedgerError::SenderNotFound,
            event: base().reason("Sender not found"),
        });
    };
    let sender_phone = sender.phone_number.clone();
    let sender_balance = sender.balance;
    let pin_ok = sender.pin.verify(pin);

    let Some(receiver) = state.user_by_phone(receiver_phone) else {
        return Ok(Outcome::Failed {
            error: LedgerError::ReceiverNotFound,
            event: base().sender_phone(&sender_phone).reason("Receiver not found"),
        });
    };
    let receiver_id = receiver.id;

    if !pin_ok {
        return Ok(Outcome::Failed {
            error: LedgerError::InvalidPin,
            event: base().sender_phone(&sender_phone).reason("Invalid PIN"),
        });
    }

    if sender_id == receiver_id {
        return Ok(Outcome::Failed {
            error: LedgerError::SelfTransfer,
            event: base()
                .sender_phone(&sender_phone)
                .reason("Cannot transfer to self"),
        });
    }

    let fee = calculate_fee(
        amount,
        state.fees.rule_for(TransactionType::P2pTransfer.fee_key()),
    );
    let total_debit = amount.value() + fee;

    if sender_balance.value() < total_debit {
        return Ok(Outcome::Failed {
            error: LedgerError::InsufficientBalance,
            event: base()
                .fee(fee)
                .sender_phone(&sender_phone)
                .reason("Insufficient balance"),
        });
    }

    state.debit_user(sender_id, total_debit)?;
    state.credit_user(receiver_id, amount.value())?;

    let reference = state.issue_reference(now);
    let transaction = Transaction {
        id: Uuid::new_v4(),
        reference: reference.clone(),
        kind: TransactionType::P2pTransfer,
        sender_id: Some(sender_id),
        receiver_id: Some(receiver_id),
        agent_id: None,
        amount: amount.value(),
        fee,
        status: TransactionStatus::Completed,
        created_at: now,
    };
    let transaction_id = transaction.id;
    state.push_transaction(transaction);

    let event = AuditEvent::new(AuditKind::P2pTransfer, AuditStatus::Completed)
        .transaction(transaction_id)
        .amount(amount.value())
        .fee(fee)
        .transaction_ref(reference.as_str())
        .sender_phone(&sender_phone)
        .receiver_phone(receiver_phone);

    Ok(Outcome::Committed {
        receipt: TransferReceipt {
            transaction_ref: reference,
        },
        event,
    })
}

fn apply_cash_in(
    state: &mut LedgerState,
    agent_id: Uuid,
    customer_phone: &str,
    amount: Amount,
) -> Result<Outcome<CashInReceipt>> {
    let now = Utc::now();
    let base = || {
        AuditEvent::new(AuditKind::CashIn, AuditStatus::Failed)
            .amount(amount.value())
            .receiver_phone(customer_phone)
    };

    let Some(agent) = state.agent(agent_id) else {
        return Ok(Outcome::Failed {
            error: LedgerError::AgentNotFound,
            event: base().reason("Agent not found"),
        });
    };
    let agent_code = agent.agent_code.clone();
    let agent_user_id = agent.user_id;
    let float_balance = agent.float_balance;
    let agent_phone = state
        .user(agent_user_id)
        .map(|u| u.phone_number.clone())
        .unwrap_or_default();

    let Some(customer) = state.user_by_phone(customer_phone) else {
        return Ok(Outcome::Failed {
            error: LedgerError::CustomerNotFound,
            event: base()
                .actor_agent(agent_id)
                .agent_code(&agent_code)
                .sender_phone(&agent_phone)
                .reason("Customer not found"),
        });
    };
    let customer_id = customer.id;

    // The float check and debit share the unit of work; a concurrent spender
    // cannot interleave between them.
    if float_balance.value() < amount.value() {
        return Ok(Outcome::Failed {
            error: LedgerError::InsufficientFloat,
            event: base()
                .actor_agent(agent_id)
                .agent_code(&agent_code)
                .sender_phone(&agent_phone)
                .reason("Agent has insufficient float balance"),
        });
    }

    state.debit_agent_float(agent_id, amount.value())?;
    state.credit_user(customer_id, amount.value())?;

    let reference = state.issue_reference(now);
    let transaction = Transaction {
        id: Uuid::new_v4(),
        reference: reference.clone(),
        kind: TransactionType::CashIn,
        sender_id: Some(agent_user_id),
        receiver_id: Some(customer_id),
        agent_id: Some(agent_id),
        amount: amount.value(),
        fee: Decimal::ZERO,
        status: TransactionStatus::Completed,
        created_at: now,
    };
    let transaction_id = transaction.id;
    state.push_transaction(transaction);

    let new_float_balance = state
        .agent(agent_id)
        .map(|a| a.float_balance)
        .unwrap_or(Balance::ZERO);

    let event = AuditEvent::new(AuditKind::CashIn, AuditStatus::Completed)
        .actor_agent(agent_id)
        .transaction(transaction_id)
        .amount(amount.value())
        .fee(Decimal::ZERO)
        .transaction_ref(reference.as_str())
        .sender_phone(&agent_phone)
        .receiver_phone(customer_phone)
        .agent_code(&agent_code);

    Ok(Outcome::Committed {
        receipt: CashInReceipt {
            transaction_ref: reference,
            new_float_balance,
        },
        event,
    })
}
