use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use uuid::Uuid;

/// Represents a monetary value held by an account.
///
/// This is a wrapper around `rust_decimal::Decimal` to enforce domain-specific
/// rules and provide type safety for financial calculations. Balances are
/// never allowed to go negative; the engines check before debiting.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// Represents a positive monetary amount for a money movement.
///
/// Ensures that transaction amounts are always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, LedgerError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(LedgerError::NonPositiveAmount)
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0.round_dp(2))
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Balance {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Balance {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Suspended,
}

/// A PIN stored as a SHA-256 digest.
///
/// The raw PIN never leaves the constructor; comparisons happen digest to
/// digest so a plain-text secret is never held alongside account state.
#[derive(Clone, PartialEq, Eq)]
pub struct Pin([u8; 32]);

impl Pin {
    pub fn new(raw: &str) -> Self {
        Self(Sha256::digest(raw.as_bytes()).into())
    }

    pub fn verify(&self, raw: &str) -> bool {
        let candidate: [u8; 32] = Sha256::digest(raw.as_bytes()).into();
        self.0 == candidate
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(..)")
    }
}

/// A customer wallet: cash balance plus identity fields used by the audit
/// trail (phone number, full name).
#[derive(Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub id: Uuid,
    pub phone_number: String,
    pub full_name: String,
    pub pin: Pin,
    pub balance: Balance,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn new(phone_number: &str, full_name: &str, pin: &str, balance: Balance) -> Self {
        Self {
            id: Uuid::new_v4(),
            phone_number: phone_number.to_string(),
            full_name: full_name.to_string(),
            pin: Pin::new(pin),
            balance,
            status: AccountStatus::Active,
            created_at: Utc::now(),
        }
    }

    /// Debits the balance, refusing to drive it negative.
    pub fn debit(&mut self, amount: Balance) -> Result<(), LedgerError> {
        if self.balance >= amount {
            self.balance -= amount;
            Ok(())
        } else {
            Err(LedgerError::InsufficientBalance)
        }
    }

    pub fn credit(&mut self, amount: Balance) {
        self.balance += amount;
    }
}

/// An agent: a pre-funded float reserve used to pay out cash operations,
/// plus an accumulated commission balance. Linked to a backing user record.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub agent_code: String,
    pub float_balance: Balance,
    pub commission_balance: Balance,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl AgentAccount {
    pub fn new(user_id: Uuid, agent_code: &str, float_balance: Balance) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            agent_code: agent_code.to_string(),
            float_balance,
            commission_balance: Balance::ZERO,
            status: AccountStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Debits the float reserve, refusing to drive it negative.
    pub fn debit_float(&mut self, amount: Balance) -> Result<(), LedgerError> {
        if self.float_balance >= amount {
            self.float_balance -= amount;
            Ok(())
        } else {
            Err(LedgerError::InsufficientFloat)
        }
    }

    pub fn credit_commission(&mut self, amount: Balance) {
        self.commission_balance += amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_arithmetic() {
        let b1 = Balance::new(dec!(10.0));
        let b2 = Balance::new(dec!(5.0));
        assert_eq!(b1 + b2, Balance::new(dec!(15.0)));
        assert_eq!(b1 - b2, Balance::new(dec!(5.0)));
    }

    #[test]
    fn test_balance_display_two_decimals() {
        assert_eq!(Balance::new(dec!(7)).to_string(), "7.00");
        assert_eq!(Balance::new(dec!(3.999)).to_string(), "4.00");
    }

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert_eq!(Amount::new(dec!(0.0)), Err(LedgerError::NonPositiveAmount));
        assert_eq!(Amount::new(dec!(-1.0)), Err(LedgerError::NonPositiveAmount));
    }

    #[test]
    fn test_pin_verification() {
        let pin = Pin::new("1234");
        assert!(pin.verify("1234"));
        assert!(!pin.verify("4321"));
    }

    #[test]
    fn test_user_debit_insufficient() {
        let mut user =
            UserAccount::new("+93700000001", "Test User", "1234", Balance::new(dec!(10)));
        let result = user.debit(Balance::new(dec!(20)));
        assert_eq!(result, Err(LedgerError::InsufficientBalance));
        assert_eq!(user.balance, Balance::new(dec!(10)));
    }

    #[test]
    fn test_user_debit_and_credit() {
        let mut user =
            UserAccount::new("+93700000001", "Test User", "1234", Balance::new(dec!(10)));
        user.debit(Balance::new(dec!(4))).unwrap();
        user.credit(Balance::new(dec!(1)));
        assert_eq!(user.balance, Balance::new(dec!(7)));
    }

    #[test]
    fn test_agent_float_guard() {
        let mut agent = AgentAccount::new(Uuid::new_v4(), "AGT001", Balance::new(dec!(100)));
        assert_eq!(
            agent.debit_float(Balance::new(dec!(150))),
            Err(LedgerError::InsufficientFloat)
        );
        agent.debit_float(Balance::new(dec!(100))).unwrap();
        assert_eq!(agent.float_balance, Balance::ZERO);
    }
}
