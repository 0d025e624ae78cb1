use crate::application::audit::AuditTrail;
use crate::application::{Outcome, record_infra_failure, settle};
use crate::domain::account::{Amount, Balance};
use crate::domain::audit::{AuditEvent, AuditKind, AuditStatus};
use crate::domain::cashout::{CashoutRequest, CashoutSnapshot, CashoutStatus};
use crate::domain::fee::calculate_fee;
use crate::domain::ports::NotificationDispatcherArc;
use crate::domain::reference::TransactionRef;
use crate::domain::transaction::{Commission, Transaction, TransactionStatus, TransactionType};
use crate::error::{LedgerError, Result};
use crate::infrastructure::in_memory::{InMemoryLedger, LedgerState};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Fixed split of the cash-out fee credited to the agent at completion. The
/// remaining share stays with the platform, tracked on the audit event but
/// credited to no account.
const AGENT_COMMISSION_RATE: Decimal = dec!(0.70);

#[derive(Debug, Clone, PartialEq)]
pub struct CashoutCreateReceipt {
    pub transaction_ref: TransactionRef,
    pub new_balance: Balance,
    pub snapshot: CashoutSnapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CashoutRespondReceipt {
    pub transaction_ref: TransactionRef,
    pub snapshot: CashoutSnapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CashoutCompleteReceipt {
    pub transaction_ref: TransactionRef,
    pub commission: Decimal,
    pub snapshot: CashoutSnapshot,
}

/// Drives the cash-out workflow: request with immediate escrow, agent
/// approval or rejection (with refund), and completion with float debit and
/// commission credit. State moves only through the transition table in
/// [`CashoutStatus`].
#[derive(Clone)]
pub struct CashoutEngine {
    store: InMemoryLedger,
    audit: Arc<AuditTrail>,
    notifier: NotificationDispatcherArc,
}

impl CashoutEngine {
    pub fn new(
        store: InMemoryLedger,
        audit: Arc<AuditTrail>,
        notifier: NotificationDispatcherArc,
    ) -> Self {
        Self {
            store,
            audit,
            notifier,
        }
    }

    /// User-initiated request. Escrows `amount + fee` from the user's balance
    /// immediately so it cannot be double-spent while the agent decides.
    pub async fn create(
        &self,
        user_id: Uuid,
        agent_code: &str,
        amount: Amount,
        pin: &str,
    ) -> Result<CashoutCreateReceipt> {
        let outcome = match self
            .store
            .with_transaction(|state| apply_create(state, user_id, agent_code, amount, pin))
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                record_infra_failure(&self.audit, AuditKind::CashoutRequest, &err).await;
                return Err(err);
            }
        };

        let receipt = settle(&self.audit, outcome).await?;
        info!(reference = %receipt.transaction_ref, amount = %amount.value(), "cash-out requested");

        let route = receipt.snapshot.agent_code.trim().to_uppercase();
        let payload = serde_json::to_value(&receipt.snapshot).unwrap_or_default();
        if let Err(err) = self
            .notifier
            .dispatch(&route, "cashout:requested", payload)
            .await
        {
            warn!(route, error = %err, "cash-out request notification failed");
        }

        Ok(receipt)
    }

    /// Agent-initiated response to a pending request. Approval keeps the
    /// escrow in place; rejection refunds it in the same atomic unit as the
    /// status change.
    pub async fn respond(
        &self,
        agent_id: Uuid,
        request_id: Uuid,
        approve: bool,
        rejection_reason: Option<String>,
    ) -> Result<CashoutRespondReceipt> {
        let outcome = match self
            .store
            .with_transaction(|state| {
                apply_respond(state, agent_id, request_id, approve, rejection_reason)
            })
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                record_infra_failure(&self.audit, AuditKind::CashoutResponse, &err).await;
                return Err(err);
            }
        };

        let receipt = settle(&self.audit, outcome).await?;
        info!(
            reference = %receipt.transaction_ref,
            status = receipt.snapshot.status.as_str(),
            "cash-out responded"
        );
        Ok(receipt)
    }

    /// Agent-initiated completion after physically disbursing cash. Debits
    /// the float, credits the commission and writes the final Transaction in
    /// one atomic unit, then notifies the user best-effort.
    pub async fn complete(&self, agent_id: Uuid, request_id: Uuid) -> Result<CashoutCompleteReceipt> {
        let outcome = match self
            .store
            .with_transaction(|state| apply_complete(state, agent_id, request_id))
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                record_infra_failure(&self.audit, AuditKind::CashoutComplete, &err).await;
                return Err(err);
            }
        };

        let receipt = settle(&self.audit, outcome).await?;
        info!(
            reference = %receipt.transaction_ref,
            commission = %receipt.commission,
            "cash-out completed"
        );

        let route = format!("USER_{}", receipt.snapshot.user_id);
        let payload = json!({
            "transactionRef": receipt.transaction_ref.as_str(),
            "amount": receipt.snapshot.amount,
            "fee": receipt.snapshot.fee,
            "status": CashoutStatus::Completed.as_str(),
            "completedAt": Utc::now(),
        });
        if let Err(err) = self
            .notifier
            .dispatch(&route, "cashout:completed", payload)
            .await
        {
            warn!(route, error = %err, "cash-out completion notification failed");
        }

        Ok(receipt)
    }

    pub async fn pending_for_agent(&self, agent_id: Uuid) -> Result<Vec<CashoutSnapshot>> {
        self.store
            .read(move |state| {
                state.cashout_snapshots(|c| {
                    c.agent_id == agent_id && c.status == CashoutStatus::Pending
                })
            })
            .await
    }

    pub async fn approved_for_agent(&self, agent_id: Uuid) -> Result<Vec<CashoutSnapshot>> {
        self.store
            .read(move |state| {
                state.cashout_snapshots(|c| {
                    c.agent_id == agent_id && c.status == CashoutStatus::Approved
                })
            })
            .await
    }

    pub async fn agent_history(&self, agent_id: Uuid) -> Result<Vec<CashoutSnapshot>> {
        self.store
            .read(move |state| state.cashout_snapshots(|c| c.agent_id == agent_id))
            .await
    }

    pub async fn user_history(&self, user_id: Uuid) -> Result<Vec<CashoutSnapshot>> {
        self.store
            .read(move |state| state.cashout_snapshots(|c| c.user_id == user_id))
            .await
    }
}

fn apply_create(
    state: &mut LedgerState,
    user_id: Uuid,
    agent_code: &str,
    amount: Amount,
    pin: &str,
) -> Result<Outcome<CashoutCreateReceipt>> {
    let now = Utc::now();
    // Agent codes are case-insensitive on input; stored uppercase.
    let agent_code = agent_code.trim().to_uppercase();
    let base = || {
        AuditEvent::new(AuditKind::CashoutRequest, AuditStatus::Failed)
            .amount(amount.value())
            .agent_code(&agent_code)
    };

    let Some(user) = state.user(user_id) else {
        return Ok(Outcome::Failed {
            error: LedgerError::UserNotFound,
            event: base().reason("User not found"),
        });
    };
    let user_phone = user.phone_number.clone();
    let user_balance = user.balance;
    let pin_ok = user.pin.verify(pin);

    if !pin_ok {
        return Ok(Outcome::Failed {
            error: LedgerError::InvalidPin,
            event: base().sender_phone(&user_phone).reason("Invalid PIN"),
        });
    }

    let Some(agent) = state.agent_by_code(&agent_code) else {
        return Ok(Outcome::Failed {
            error: LedgerError::InvalidAgentCode,
            event: base().sender_phone(&user_phone).reason("Invalid agent code"),
        });
    };
    if !agent.is_active() {
        return Ok(Outcome::Failed {
            error: LedgerError::AgentNotActive,
            event: base()
                .actor_agent(agent.id)
                .sender_phone(&user_phone)
                .reason("Agent is not active"),
        });
    }
    let agent = agent.clone();

    let fee = calculate_fee(
        amount,
        state.fees.rule_for(TransactionType::CashOut.fee_key()),
    );
    let total_deduction = amount.value() + fee;

    if user_balance.value() < total_deduction {
        return Ok(Outcome::Failed {
            error: LedgerError::InsufficientBalance,
            event: base()
                .actor_agent(agent.id)
                .fee(fee)
                .sender_phone(&user_phone)
                .reason("Insufficient balance"),
        });
    }

    state.debit_user(user_id, total_deduction)?;

    let reference = state.issue_reference(now);
    let request = CashoutRequest::new(user_id, &agent, amount.value(), fee, reference.clone(), now);
    let request_id = request.id;
    let snapshot = state.snapshot_of(&request);
    state.cashouts.insert(request_id, request);

    let new_balance = state
        .user(user_id)
        .map(|u| u.balance)
        .unwrap_or(Balance::ZERO);

    let event = AuditEvent::new(AuditKind::CashoutRequest, AuditStatus::Pending)
        .actor_agent(agent.id)
        .cashout_request(request_id)
        .amount(amount.value())
        .fee(fee)
        .transaction_ref(reference.as_str())
        .sender_phone(&user_phone)
        .agent_code(&agent.agent_code);

    Ok(Outcome::Committed {
        receipt: CashoutCreateReceipt {
            transaction_ref: reference,
            new_balance,
            snapshot,
        },
        event,
    })
}

fn apply_respond(
    state: &mut LedgerState,
    agent_id: Uuid,
    request_id: Uuid,
    approve: bool,
    rejection_reason: Option<String>,
) -> Result<Outcome<CashoutRespondReceipt>> {
    let now = Utc::now();
    let base = || {
        AuditEvent::new(AuditKind::CashoutResponse, AuditStatus::Failed)
            .actor_agent(agent_id)
            .cashout_request(request_id)
    };

    let found = state.cashout(request_id).filter(|c| c.agent_id == agent_id);
    let Some(request) = found else {
        return Ok(Outcome::Failed {
            error: LedgerError::RequestNotFound,
            event: base().reason("Cash-out request not found"),
        });
    };
    let user_id = request.user_id;
    let user_phone = state
        .user(user_id)
        .map(|u| u.phone_number.clone())
        .unwrap_or_default();
    let agent_code = request.agent_code.clone();
    let reference = request.reference.clone();

    // Responding to an already-resolved request is an error, not a no-op.
    if request.status != CashoutStatus::Pending {
        return Ok(Outcome::Failed {
            error: LedgerError::AlreadyResponded,
            event: base()
                .transaction_ref(reference.as_str())
                .sender_phone(&user_phone)
                .agent_code(&agent_code)
                .reason("Cash-out request already responded to"),
        });
    }

    let request = state
        .cashouts
        .get_mut(&request_id)
        .ok_or(LedgerError::RequestNotFound)?;

    let (updated, event) = if approve {
        request.approve(now)?;
        let event = AuditEvent::new(AuditKind::CashoutResponse, AuditStatus::Approved)
            .actor_agent(agent_id)
            .cashout_request(request_id)
            .amount(request.amount)
            .fee(request.fee)
            .transaction_ref(reference.as_str())
            .sender_phone(&user_phone)
            .agent_code(&agent_code);
        (request.clone(), event)
    } else {
        request.reject(rejection_reason.clone(), now)?;
        let amount = request.amount;
        let fee = request.fee;
        let refund = request.escrowed_total();
        let updated = request.clone();
        // Refund reverses the create-time escrow exactly, in the same unit
        // of work as the status change.
        state.credit_user(user_id, refund)?;
        let mut event = AuditEvent::new(AuditKind::CashoutResponse, AuditStatus::Rejected)
            .actor_agent(agent_id)
            .cashout_request(request_id)
            .amount(amount)
            .fee(fee)
            .transaction_ref(reference.as_str())
            .sender_phone(&user_phone)
            .agent_code(&agent_code);
        if let Some(reason) = rejection_reason {
            event = event.reason(reason);
        }
        (updated, event)
    };

    let snapshot = state.snapshot_of(&updated);

    Ok(Outcome::Committed {
        receipt: CashoutRespondReceipt {
            transaction_ref: reference,
            snapshot,
        },
        event,
    })
}

fn apply_complete(
    state: &mut LedgerState,
    agent_id: Uuid,
    request_id: Uuid,
) -> Result<Outcome<CashoutCompleteReceipt>> {
    let now = Utc::now();
    let base = || {
        AuditEvent::new(AuditKind::CashoutComplete, AuditStatus::Failed)
            .actor_agent(agent_id)
            .cashout_request(request_id)
    };

    let found = state.cashout(request_id).filter(|c| c.agent_id == agent_id);
    let Some(request) = found else {
        return Ok(Outcome::Failed {
            error: LedgerError::RequestNotFound,
            event: base().reason("Cash-out request not found"),
        });
    };
    let reference = request.reference.clone();
    let amount = request.amount;
    let fee = request.fee;
    let user_id = request.user_id;
    let user_phone = state
        .user(user_id)
        .map(|u| u.phone_number.clone())
        .unwrap_or_default();

    // A second complete (or a complete on a pending/rejected request) fails
    // here, before any balance is touched.
    if request.status != CashoutStatus::Approved {
        return Ok(Outcome::Failed {
            error: LedgerError::NotApproved,
            event: base()
                .transaction_ref(reference.as_str())
                .amount(amount)
                .fee(fee)
                .agent_code(&request.agent_code)
                .reason("Cash-out request is not approved yet"),
        });
    }

    let Some(agent) = state.agent(agent_id) else {
        return Ok(Outcome::Failed {
            error: LedgerError::AgentNotFound,
            event: base()
                .transaction_ref(reference.as_str())
                .reason("Agent not found"),
        });
    };
    let agent_code = agent.agent_code.clone();

    if agent.float_balance.value() < amount {
        return Ok(Outcome::Failed {
            error: LedgerError::InsufficientFloat,
            event: base()
                .transaction_ref(reference.as_str())
                .amount(amount)
                .fee(fee)
                .agent_code(&agent_code)
                .reason("Agent has insufficient float balance to complete cash-out"),
        });
    }

    state.debit_agent_float(agent_id, amount)?;

    let commission = (fee * AGENT_COMMISSION_RATE).round_dp(2);
    let platform_share = fee - commission;
    state.credit_agent_commission(agent_id, commission)?;

    let updated = {
        let request = state
            .cashouts
            .get_mut(&request_id)
            .ok_or(LedgerError::RequestNotFound)?;
        request.complete()?;
        request.clone()
    };

    // The final Transaction reuses the reference assigned at creation.
    let transaction = Transaction {
        id: Uuid::new_v4(),
        reference: reference.clone(),
        kind: TransactionType::CashOut,
        sender_id: Some(user_id),
        receiver_id: None,
        agent_id: Some(agent_id),
        amount,
        fee,
        status: TransactionStatus::Completed,
        created_at: now,
    };
    let transaction_id = transaction.id;
    state.push_transaction(transaction);
    state.push_commission(Commission::new(agent_id, transaction_id, commission, now));

    let snapshot = state.snapshot_of(&updated);

    let event = AuditEvent::new(AuditKind::CashoutComplete, AuditStatus::Completed)
        .actor_agent(agent_id)
        .cashout_request(request_id)
        .transaction(transaction_id)
        .amount(amount)
        .fee(fee)
        .commission(commission)
        .transaction_ref(reference.as_str())
        .sender_phone(&user_phone)
        .agent_code(&agent_code)
        .data_json(json!({ "platform_share": platform_share }));

    Ok(Outcome::Committed {
        receipt: CashoutCompleteReceipt {
            transaction_ref: reference,
            commission,
            snapshot,
        },
        event,
    })
}
