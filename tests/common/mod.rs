#![allow(dead_code)]

use mmledger::application::audit::AuditTrail;
use mmledger::application::cashout::CashoutEngine;
use mmledger::application::ledger::LedgerEngine;
use mmledger::domain::account::{AgentAccount, Amount, Balance, UserAccount};
use mmledger::domain::fee::FeeSchedule;
use mmledger::infrastructure::channels::{BroadcastSink, ChannelDispatcher};
use mmledger::infrastructure::in_memory::{InMemoryAuditStore, InMemoryLedger, LedgerState};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

pub const SENDER_PHONE: &str = "+93700000001";
pub const RECEIVER_PHONE: &str = "+93700000002";
pub const AGENT_PHONE: &str = "+93700000009";
pub const AGENT_CODE: &str = "AGT001";
pub const PIN: &str = "1234";

/// A fully wired engine stack over a seeded store:
/// - sender with 1000, receiver with 100
/// - one active agent (AGT001) with a 1000 float
/// - fees: p2p_transfer 1% min 5, cash_out 5% min 10
pub struct Fixture {
    pub store: InMemoryLedger,
    pub audit_store: InMemoryAuditStore,
    pub dispatcher: ChannelDispatcher,
    pub ledger: LedgerEngine,
    pub cashout: CashoutEngine,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub agent_id: Uuid,
}

pub fn fixture() -> Fixture {
    let fees = FeeSchedule::new()
        .with_rule("p2p_transfer", dec!(0.01), dec!(5))
        .with_rule("cash_out", dec!(0.05), dec!(10));

    let mut state = LedgerState::new(fees);
    let sender_id = state.insert_user(UserAccount::new(
        SENDER_PHONE,
        "Zahra Ahmadi",
        PIN,
        Balance::new(dec!(1000)),
    ));
    let receiver_id = state.insert_user(UserAccount::new(
        RECEIVER_PHONE,
        "Karim Rahimi",
        PIN,
        Balance::new(dec!(100)),
    ));
    let agent_user_id = state.insert_user(UserAccount::new(
        AGENT_PHONE,
        "Omid Stanikzai",
        "9999",
        Balance::ZERO,
    ));
    let agent_id = state.insert_agent(AgentAccount::new(
        agent_user_id,
        AGENT_CODE,
        Balance::new(dec!(1000)),
    ));

    let store = InMemoryLedger::new(state);
    let audit_store = InMemoryAuditStore::new();
    let audit = Arc::new(AuditTrail::new(
        Box::new(audit_store.clone()),
        Box::new(BroadcastSink::new()),
    ));
    let dispatcher = ChannelDispatcher::new();
    let ledger = LedgerEngine::new(store.clone(), audit.clone());
    let cashout = CashoutEngine::new(store.clone(), audit, Arc::new(dispatcher.clone()));

    Fixture {
        store,
        audit_store,
        dispatcher,
        ledger,
        cashout,
        sender_id,
        receiver_id,
        agent_id,
    }
}

pub fn amount(value: Decimal) -> Amount {
    Amount::new(value).unwrap()
}

pub async fn user_balance(store: &InMemoryLedger, id: Uuid) -> Balance {
    store
        .read(move |state| state.user(id).unwrap().balance)
        .await
        .unwrap()
}

pub async fn agent_snapshot(store: &InMemoryLedger, id: Uuid) -> AgentAccount {
    store
        .read(move |state| state.agent(id).unwrap().clone())
        .await
        .unwrap()
}

pub async fn transaction_count(store: &InMemoryLedger) -> usize {
    store
        .read(|state| state.transactions.len())
        .await
        .unwrap()
}
