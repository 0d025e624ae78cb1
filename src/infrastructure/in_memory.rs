use crate::domain::account::{AgentAccount, Balance, UserAccount};
use crate::domain::audit::AuditEvent;
use crate::domain::cashout::{CashoutRequest, CashoutSnapshot};
use crate::domain::fee::FeeSchedule;
use crate::domain::ports::AuditStore;
use crate::domain::reference::TransactionRef;
use crate::domain::transaction::{Commission, Transaction};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;
use uuid::Uuid;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// The full shared account store: the stand-in for the relational schema the
/// design assumes. Mutated only inside [`InMemoryLedger::with_transaction`].
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    pub users: HashMap<Uuid, UserAccount>,
    pub agents: HashMap<Uuid, AgentAccount>,
    pub transactions: Vec<Transaction>,
    pub cashouts: HashMap<Uuid, CashoutRequest>,
    pub commissions: Vec<Commission>,
    pub fees: FeeSchedule,
}

impl LedgerState {
    pub fn new(fees: FeeSchedule) -> Self {
        Self {
            fees,
            ..Self::default()
        }
    }

    pub fn insert_user(&mut self, user: UserAccount) -> Uuid {
        let id = user.id;
        self.users.insert(id, user);
        id
    }

    pub fn insert_agent(&mut self, agent: AgentAccount) -> Uuid {
        let id = agent.id;
        self.agents.insert(id, agent);
        id
    }

    pub fn user(&self, id: Uuid) -> Option<&UserAccount> {
        self.users.get(&id)
    }

    pub fn user_by_phone(&self, phone: &str) -> Option<&UserAccount> {
        self.users.values().find(|u| u.phone_number == phone)
    }

    pub fn agent(&self, id: Uuid) -> Option<&AgentAccount> {
        self.agents.get(&id)
    }

    pub fn agent_by_code(&self, code: &str) -> Option<&AgentAccount> {
        self.agents.values().find(|a| a.agent_code == code)
    }

    pub fn cashout(&self, id: Uuid) -> Option<&CashoutRequest> {
        self.cashouts.get(&id)
    }

    /// Debits a user balance; the caller is expected to have validated the
    /// account, so `UserNotFound` here aborts the unit of work.
    pub fn debit_user(&mut self, id: Uuid, amount: Decimal) -> Result<()> {
        self.users
            .get_mut(&id)
            .ok_or(LedgerError::UserNotFound)?
            .debit(Balance::new(amount))
    }

    pub fn credit_user(&mut self, id: Uuid, amount: Decimal) -> Result<()> {
        self.users
            .get_mut(&id)
            .ok_or(LedgerError::UserNotFound)?
            .credit(Balance::new(amount));
        Ok(())
    }

    pub fn debit_agent_float(&mut self, id: Uuid, amount: Decimal) -> Result<()> {
        self.agents
            .get_mut(&id)
            .ok_or(LedgerError::AgentNotFound)?
            .debit_float(Balance::new(amount))
    }

    pub fn credit_agent_commission(&mut self, id: Uuid, amount: Decimal) -> Result<()> {
        self.agents
            .get_mut(&id)
            .ok_or(LedgerError::AgentNotFound)?
            .credit_commission(Balance::new(amount));
        Ok(())
    }

    fn reference_in_use(&self, reference: &TransactionRef) -> bool {
        self.transactions.iter().any(|t| &t.reference == reference)
            || self.cashouts.values().any(|c| &c.reference == reference)
    }

    /// Issues a reference guaranteed unique across transactions and cash-out
    /// requests currently in the store.
    pub fn issue_reference(&self, now: DateTime<Utc>) -> TransactionRef {
        loop {
            let candidate = TransactionRef::generate(now);
            if !self.reference_in_use(&candidate) {
                return candidate;
            }
        }
    }

    pub fn push_transaction(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }

    pub fn push_commission(&mut self, commission: Commission) {
        self.commissions.push(commission);
    }

    pub fn snapshot_of(&self, request: &CashoutRequest) -> CashoutSnapshot {
        let user = self.users.get(&request.user_id);
        let agent_user = self
            .agents
            .get(&request.agent_id)
            .and_then(|a| self.users.get(&a.user_id));
        CashoutSnapshot::of(request, user, agent_user)
    }

    pub fn cashout_snapshots<F>(&self, filter: F) -> Vec<CashoutSnapshot>
    where
        F: Fn(&CashoutRequest) -> bool,
    {
        let mut snapshots: Vec<CashoutSnapshot> = self
            .cashouts
            .values()
            .filter(|c| filter(c))
            .map(|c| self.snapshot_of(c))
            .collect();
        snapshots.sort_by_key(|s| std::cmp::Reverse(s.responded_at.unwrap_or(s.requested_at)));
        snapshots
    }

    pub fn transactions_where<F>(&self, filter: F, limit: usize) -> Vec<Transaction>
    where
        F: Fn(&Transaction) -> bool,
    {
        let mut rows: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|t| filter(t))
            .cloned()
            .collect();
        rows.sort_by_key(|t| std::cmp::Reverse(t.created_at));
        rows.truncate(limit);
        rows
    }
}

/// The unit-of-work boundary over the shared state.
///
/// A write lock acquired with a bounded timeout serializes conflicting
/// balance mutations; the closure works on a draft that replaces the live
/// state only when it returns `Ok`, so a failed operation leaves no partial
/// mutation behind.
#[derive(Clone)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
    lock_timeout: Duration,
}

impl InMemoryLedger {
    pub fn new(state: LedgerState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub async fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut LedgerState) -> Result<T> + Send,
        T: Send,
    {
        let mut guard = timeout(self.lock_timeout, self.state.write())
            .await
            .map_err(|_| LedgerError::LockTimeout)?;
        let mut draft = guard.clone();
        let out = f(&mut draft)?;
        *guard = draft;
        Ok(out)
    }

    pub async fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&LedgerState) -> T + Send,
        T: Send,
    {
        let guard = timeout(self.lock_timeout, self.state.read())
            .await
            .map_err(|_| LedgerError::LockTimeout)?;
        Ok(f(&guard))
    }
}

/// A thread-safe in-memory audit store.
///
/// Uses `Arc<RwLock<Vec<AuditEvent>>>` so clones observe the same log;
/// append-only by construction.
#[derive(Default, Clone)]
pub struct InMemoryAuditStore {
    events: Arc<RwLock<Vec<AuditEvent>>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, event: AuditEvent) -> Result<()> {
        let mut events = self.events.write().await;
        events.push(event);
        Ok(())
    }

    async fn events(&self) -> Result<Vec<AuditEvent>> {
        let events = self.events.read().await;
        Ok(events.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audit::{AuditKind, AuditStatus};
    use rust_decimal_macros::dec;

    fn state_with_user(balance: Decimal) -> (LedgerState, Uuid) {
        let mut state = LedgerState::default();
        let user = UserAccount::new("+93700000001", "Test User", "1234", Balance::new(balance));
        let id = state.insert_user(user);
        (state, id)
    }

    #[tokio::test]
    async fn test_commit_on_success() {
        let (state, user_id) = state_with_user(dec!(100));
        let ledger = InMemoryLedger::new(state);

        ledger
            .with_transaction(|state| state.debit_user(user_id, dec!(40)))
            .await
            .unwrap();

        let balance = ledger
            .read(|state| state.user(user_id).unwrap().balance)
            .await
            .unwrap();
        assert_eq!(balance, Balance::new(dec!(60)));
    }

    #[tokio::test]
    async fn test_rollback_on_error() {
        let (state, user_id) = state_with_user(dec!(100));
        let ledger = InMemoryLedger::new(state);

        let result = ledger
            .with_transaction(|state| {
                state.debit_user(user_id, dec!(40))?;
                // The second debit exceeds what is left; the first must not
                // survive either.
                state.debit_user(user_id, dec!(70))
            })
            .await;

        assert_eq!(result, Err(LedgerError::InsufficientBalance));
        let balance = ledger
            .read(|state| state.user(user_id).unwrap().balance)
            .await
            .unwrap();
        assert_eq!(balance, Balance::new(dec!(100)));
    }

    #[tokio::test]
    async fn test_issued_references_are_unique() {
        let (mut state, _) = state_with_user(dec!(0));
        let now = Utc::now();
        let first = state.issue_reference(now);
        state.push_transaction(Transaction {
            id: Uuid::new_v4(),
            reference: first.clone(),
            kind: crate::domain::transaction::TransactionType::CashIn,
            sender_id: None,
            receiver_id: None,
            agent_id: Some(Uuid::new_v4()),
            amount: dec!(1),
            fee: dec!(0),
            status: crate::domain::transaction::TransactionStatus::Completed,
            created_at: now,
        });
        let second = state.issue_reference(now);
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_audit_store_appends() {
        let store = InMemoryAuditStore::new();
        store
            .append(AuditEvent::new(AuditKind::CashIn, AuditStatus::Completed))
            .await
            .unwrap();
        store
            .append(AuditEvent::new(AuditKind::CashIn, AuditStatus::Failed))
            .await
            .unwrap();

        let events = store.events().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].status, AuditStatus::Completed);
    }
}
