use clap::Parser;
use miette::{IntoDiagnostic, Result};
use mmledger::application::audit::AuditTrail;
use mmledger::application::cashout::CashoutEngine;
use mmledger::application::ledger::LedgerEngine;
use mmledger::domain::account::Amount;
use mmledger::domain::ports::NotificationDispatcherArc;
use mmledger::infrastructure::channels::{BroadcastSink, ChannelDispatcher};
use mmledger::infrastructure::in_memory::{InMemoryAuditStore, InMemoryLedger};
use mmledger::interfaces::csv::operation_reader::{OperationReader, OperationRow};
use mmledger::interfaces::csv::seed_reader::SeedReader;
use mmledger::interfaces::csv::summary_writer::SummaryWriter;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Account and fee-schedule seed CSV
    accounts: PathBuf,

    /// Scripted operations CSV
    operations: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let seed = File::open(&cli.accounts).into_diagnostic()?;
    let state = SeedReader::new(seed).into_state().into_diagnostic()?;
    let store = InMemoryLedger::new(state);

    let audit = Arc::new(AuditTrail::new(
        Box::new(InMemoryAuditStore::new()),
        Box::new(BroadcastSink::new()),
    ));
    let notifier: NotificationDispatcherArc = Arc::new(ChannelDispatcher::new());
    let ledger = LedgerEngine::new(store.clone(), audit.clone());
    let cashout = CashoutEngine::new(store.clone(), audit.clone(), notifier);

    let ops = File::open(&cli.operations).into_diagnostic()?;
    for row in OperationReader::new(ops).operations() {
        match row {
            Ok(row) => {
                let op = row.op.clone();
                match execute(&store, &ledger, &cashout, row).await {
                    Ok(line) => println!("{op} ok {line}"),
                    Err(message) => println!("{op} failed: {message}"),
                }
            }
            Err(err) => eprintln!("Error reading operation: {err}"),
        }
    }

    let snapshot = store.read(|state| state.clone()).await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = SummaryWriter::new(stdout.lock());
    writer.write_summary(&snapshot).into_diagnostic()?;

    Ok(())
}

async fn execute(
    store: &InMemoryLedger,
    ledger: &LedgerEngine,
    cashout: &CashoutEngine,
    row: OperationRow,
) -> std::result::Result<String, String> {
    match row.op.as_str() {
        "transfer" => {
            let sender_id = resolve_user(store, &row.actor).await?;
            let receiver_phone = require(&row.target, "target")?;
            let amount = require_amount(&row)?;
            let pin = require(&row.pin, "pin")?;
            let receipt = ledger
                .transfer_p2p(sender_id, &receiver_phone, amount, &pin)
                .await
                .map_err(|e| e.to_string())?;
            Ok(receipt.transaction_ref.to_string())
        }
        "cash_in" => {
            let agent_id = resolve_agent(store, &row.actor).await?;
            let customer_phone = require(&row.target, "target")?;
            let amount = require_amount(&row)?;
            let receipt = ledger
                .cash_in(agent_id, &customer_phone, amount)
                .await
                .map_err(|e| e.to_string())?;
            Ok(format!(
                "{} float {}",
                receipt.transaction_ref, receipt.new_float_balance
            ))
        }
        "cashout_request" => {
            let user_id = resolve_user(store, &row.actor).await?;
            let agent_code = require(&row.target, "target")?;
            let amount = require_amount(&row)?;
            let pin = require(&row.pin, "pin")?;
            let receipt = cashout
                .create(user_id, &agent_code, amount, &pin)
                .await
                .map_err(|e| e.to_string())?;
            Ok(format!(
                "{} balance {}",
                receipt.transaction_ref, receipt.new_balance
            ))
        }
        "cashout_approve" | "cashout_reject" => {
            let agent_id = resolve_agent(store, &row.actor).await?;
            let reference = require(&row.target, "target")?;
            let request_id = resolve_request(store, &reference).await?;
            let approve = row.op == "cashout_approve";
            let receipt = cashout
                .respond(agent_id, request_id, approve, row.reason.clone())
                .await
                .map_err(|e| e.to_string())?;
            Ok(format!(
                "{} {}",
                receipt.transaction_ref,
                receipt.snapshot.status.as_str()
            ))
        }
        "cashout_complete" => {
            let agent_id = resolve_agent(store, &row.actor).await?;
            let reference = require(&row.target, "target")?;
            let request_id = resolve_request(store, &reference).await?;
            let receipt = cashout
                .complete(agent_id, request_id)
                .await
                .map_err(|e| e.to_string())?;
            Ok(format!(
                "{} commission {:.2}",
                receipt.transaction_ref, receipt.commission
            ))
        }
        other => Err(format!("unknown op: {other}")),
    }
}

async fn resolve_user(store: &InMemoryLedger, phone: &str) -> std::result::Result<Uuid, String> {
    store
        .read(|state| state.user_by_phone(phone).map(|u| u.id))
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("unknown user phone: {phone}"))
}

async fn resolve_agent(store: &InMemoryLedger, code: &str) -> std::result::Result<Uuid, String> {
    store
        .read(|state| state.agent_by_code(code).map(|a| a.id))
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("unknown agent code: {code}"))
}

async fn resolve_request(
    store: &InMemoryLedger,
    reference: &str,
) -> std::result::Result<Uuid, String> {
    store
        .read(|state| {
            state
                .cashouts
                .values()
                .find(|c| c.reference.as_str() == reference)
                .map(|c| c.id)
        })
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("unknown transaction reference: {reference}"))
}

fn require(field: &Option<String>, name: &str) -> std::result::Result<String, String> {
    field
        .clone()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("missing {name}"))
}

fn require_amount(row: &OperationRow) -> std::result::Result<Amount, String> {
    let value = row.amount.ok_or_else(|| "missing amount".to_string())?;
    Amount::new(value).map_err(|e| e.to_string())
}
