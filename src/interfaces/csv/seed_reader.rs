use crate::domain::account::{AgentAccount, Balance, UserAccount};
use crate::domain::fee::FeeSchedule;
use crate::error::LedgerError;
use crate::infrastructure::in_memory::LedgerState;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Seed error: {0}")]
    Invalid(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// One row of the account seed file. `kind` selects which columns apply:
/// `user` (phone, name, pin, balance), `agent` (adds agent_code and
/// float_balance; the backing user is created from the same row) or `fee`
/// (fee_type, fee_percentage, fee_minimum).
#[derive(Debug, Deserialize)]
pub struct SeedRow {
    pub kind: String,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub pin: Option<String>,
    pub balance: Option<Decimal>,
    pub agent_code: Option<String>,
    pub float_balance: Option<Decimal>,
    pub fee_type: Option<String>,
    pub fee_percentage: Option<Decimal>,
    pub fee_minimum: Option<Decimal>,
}

/// Builds the initial ledger state from a CSV seed source.
pub struct SeedReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> SeedReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn into_state(self) -> Result<LedgerState, SeedError> {
        let mut fees = FeeSchedule::new();
        let mut users: Vec<UserAccount> = Vec::new();
        let mut agents: Vec<(UserAccount, String, Decimal)> = Vec::new();

        for row in self.reader.into_deserialize::<SeedRow>() {
            let row = row?;
            match row.kind.as_str() {
                "user" => {
                    let (phone, name, pin) = identity_of(&row)?;
                    users.push(UserAccount::new(
                        &phone,
                        &name,
                        &pin,
                        Balance::new(row.balance.unwrap_or_default()),
                    ));
                }
                "agent" => {
                    let (phone, name, pin) = identity_of(&row)?;
                    let code = row
                        .agent_code
                        .ok_or_else(|| SeedError::Invalid("agent row missing agent_code".into()))?;
                    let backing = UserAccount::new(
                        &phone,
                        &name,
                        &pin,
                        Balance::new(row.balance.unwrap_or_default()),
                    );
                    agents.push((backing, code, row.float_balance.unwrap_or_default()));
                }
                "fee" => {
                    let fee_type = row
                        .fee_type
                        .ok_or_else(|| SeedError::Invalid("fee row missing fee_type".into()))?;
                    fees = fees.with_rule(
                        &fee_type,
                        row.fee_percentage.unwrap_or_default(),
                        row.fee_minimum.unwrap_or_default(),
                    );
                }
                other => {
                    return Err(SeedError::Invalid(format!("unknown seed kind: {other}")));
                }
            }
        }

        let mut state = LedgerState::new(fees);
        for user in users {
            state.insert_user(user);
        }
        for (backing, code, float) in agents {
            let user_id = state.insert_user(backing);
            state.insert_agent(AgentAccount::new(user_id, &code, Balance::new(float)));
        }
        Ok(state)
    }
}

fn identity_of(row: &SeedRow) -> Result<(String, String, String), SeedError> {
    let phone = row
        .phone
        .clone()
        .ok_or_else(|| SeedError::Invalid(format!("{} row missing phone", row.kind)))?;
    let name = row.name.clone().unwrap_or_default();
    let pin = row
        .pin
        .clone()
        .ok_or_else(|| SeedError::Invalid(format!("{} row missing pin", row.kind)))?;
    Ok((phone, name, pin))
}
