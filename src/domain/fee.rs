use crate::domain::account::Amount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single fee schedule entry: percentage of the amount, floored at a
/// minimum charge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeRule {
    pub percentage: Decimal,
    pub minimum: Decimal,
}

/// Read-only reference data mapping a transaction-type key
/// (`"p2p_transfer"`, `"cash_out"`, ...) to its fee rule.
#[derive(Debug, Clone, Default)]
pub struct FeeSchedule {
    rules: HashMap<String, FeeRule>,
}

impl FeeSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, transaction_type: &str, percentage: Decimal, minimum: Decimal) -> Self {
        self.rules.insert(
            transaction_type.to_string(),
            FeeRule {
                percentage,
                minimum,
            },
        );
        self
    }

    pub fn rule_for(&self, transaction_type: &str) -> Option<&FeeRule> {
        self.rules.get(transaction_type)
    }
}

/// Pure fee computation: `max(amount * percentage, minimum)`, or zero when no
/// rule exists for the transaction type. No side effects, no failure modes.
pub fn calculate_fee(amount: Amount, rule: Option<&FeeRule>) -> Decimal {
    match rule {
        Some(rule) => (amount.value() * rule.percentage).max(rule.minimum),
        None => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn amount(value: Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    #[test]
    fn test_percentage_fee_above_minimum() {
        let rule = FeeRule {
            percentage: dec!(0.01),
            minimum: dec!(5),
        };
        assert_eq!(calculate_fee(amount(dec!(1000)), Some(&rule)), dec!(10.00));
    }

    #[test]
    fn test_minimum_fee_floor() {
        let rule = FeeRule {
            percentage: dec!(0.01),
            minimum: dec!(5),
        };
        assert_eq!(calculate_fee(amount(dec!(100)), Some(&rule)), dec!(5));
    }

    #[test]
    fn test_missing_rule_means_free() {
        assert_eq!(calculate_fee(amount(dec!(100)), None), Decimal::ZERO);
    }

    #[test]
    fn test_schedule_lookup() {
        let schedule = FeeSchedule::new()
            .with_rule("p2p_transfer", dec!(0.01), dec!(5))
            .with_rule("cash_out", dec!(0.05), dec!(10));

        assert!(schedule.rule_for("p2p_transfer").is_some());
        assert!(schedule.rule_for("cash_out").is_some());
        assert!(schedule.rule_for("cash_in").is_none());
    }
}
