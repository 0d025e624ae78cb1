use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OperationError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One scripted operation. Column meaning depends on `op`:
///
/// | op               | actor        | target         | amount | pin | reason |
/// |------------------|--------------|----------------|--------|-----|--------|
/// | transfer         | sender phone | receiver phone | yes    | yes |        |
/// | cash_in          | agent code   | customer phone | yes    |     |        |
/// | cashout_request  | user phone   | agent code     | yes    | yes |        |
/// | cashout_approve  | agent code   | txn reference  |        |     |        |
/// | cashout_reject   | agent code   | txn reference  |        |     | yes    |
/// | cashout_complete | agent code   | txn reference  |        |     |        |
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct OperationRow {
    pub op: String,
    pub actor: String,
    pub target: Option<String>,
    pub amount: Option<Decimal>,
    pub pin: Option<String>,
    pub reason: Option<String>,
}

/// Reads scripted operations from a CSV source, streaming like the seed
/// reader: whitespace-trimmed, flexible record lengths.
pub struct OperationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OperationReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn operations(self) -> impl Iterator<Item = Result<OperationRow, OperationError>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(OperationError::from))
    }
}
