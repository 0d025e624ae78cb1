use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-readable reference shared by a Transaction and, for cash-outs, the
/// CashoutRequest that originated it: `TXN` + 8-digit UTC date + 6 uppercase
/// alphanumeric characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionRef(String);

impl TransactionRef {
    /// Generates a fresh reference. Uniqueness is not guaranteed here; the
    /// store rejects or regenerates on collision at insert time.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(|b| (b as char).to_ascii_uppercase())
            .collect();
        Self(format!("TXN{}{}", now.format("%Y%m%d"), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
