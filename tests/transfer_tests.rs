mod common;

use common::{RECEIVER_PHONE, SENDER_PHONE, amount, fixture, user_balance};
use mmledger::domain::audit::{AuditKind, AuditStatus};
use mmledger::domain::ports::AuditStore;
use mmledger::error::LedgerError;
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test]
async fn test_transfer_moves_amount_and_fee() {
    let f = fixture();

    let receipt = f
        .ledger
        .transfer_p2p(f.sender_id, RECEIVER_PHONE, amount(dec!(100)), common::PIN)
        .await
        .unwrap();

    // Fee is max(100 * 1%, 5) = 5; sender pays amount + fee, receiver gets
    // the amount only.
    assert_eq!(
        user_balance(&f.store, f.sender_id).await.value(),
        dec!(895)
    );
    assert_eq!(
        user_balance(&f.store, f.receiver_id).await.value(),
        dec!(200)
    );
    assert!(receipt.transaction_ref.as_str().starts_with("TXN"));

    let transactions = f.ledger.user_transactions(f.sender_id).await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].reference, receipt.transaction_ref);
    assert_eq!(transactions[0].fee, dec!(5));
}

#[tokio::test]
async fn test_percentage_fee_applies_above_minimum() {
    let f = fixture();

    f.ledger
        .transfer_p2p(f.sender_id, RECEIVER_PHONE, amount(dec!(800)), common::PIN)
        .await
        .unwrap();

    // 800 * 1% = 8 beats the 5 minimum.
    assert_eq!(
        user_balance(&f.store, f.sender_id).await.value(),
        dec!(192)
    );
}

#[tokio::test]
async fn test_transfer_success_produces_completed_audit_event() {
    let f = fixture();

    let receipt = f
        .ledger
        .transfer_p2p(f.sender_id, RECEIVER_PHONE, amount(dec!(100)), common::PIN)
        .await
        .unwrap();

    let events = f.audit_store.events().await.unwrap();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.kind, AuditKind::P2pTransfer);
    assert_eq!(event.status, AuditStatus::Completed);
    assert_eq!(event.amount, Some(dec!(100)));
    assert_eq!(event.fee, Some(dec!(5)));
    assert_eq!(
        event.transaction_ref.as_deref(),
        Some(receipt.transaction_ref.as_str())
    );
    assert_eq!(event.sender_phone.as_deref(), Some(SENDER_PHONE));
    assert_eq!(event.receiver_phone.as_deref(), Some(RECEIVER_PHONE));
}

#[tokio::test]
async fn test_unknown_sender_rejected() {
    let f = fixture();

    let err = f
        .ledger
        .transfer_p2p(Uuid::new_v4(), RECEIVER_PHONE, amount(dec!(100)), common::PIN)
        .await
        .unwrap_err();

    assert_eq!(err, LedgerError::SenderNotFound);
    assert_eq!(
        user_balance(&f.store, f.receiver_id).await.value(),
        dec!(100)
    );
}

#[tokio::test]
async fn test_unknown_receiver_rejected() {
    let f = fixture();

    let err = f
        .ledger
        .transfer_p2p(f.sender_id, "+93799999999", amount(dec!(100)), common::PIN)
        .await
        .unwrap_err();

    assert_eq!(err, LedgerError::ReceiverNotFound);
    assert_eq!(
        user_balance(&f.store, f.sender_id).await.value(),
        dec!(1000)
    );
}

#[tokio::test]
async fn test_wrong_pin_rejected_before_balances_move() {
    let f = fixture();

    let err = f
        .ledger
        .transfer_p2p(f.sender_id, RECEIVER_PHONE, amount(dec!(100)), "0000")
        .await
        .unwrap_err();

    assert_eq!(err, LedgerError::InvalidPin);
    assert_eq!(
        user_balance(&f.store, f.sender_id).await.value(),
        dec!(1000)
    );
    assert_eq!(
        user_balance(&f.store, f.receiver_id).await.value(),
        dec!(100)
    );
}

#[tokio::test]
async fn test_self_transfer_rejected() {
    let f = fixture();

    let err = f
        .ledger
        .transfer_p2p(f.sender_id, SENDER_PHONE, amount(dec!(100)), common::PIN)
        .await
        .unwrap_err();

    assert_eq!(err, LedgerError::SelfTransfer);
    assert_eq!(
        user_balance(&f.store, f.sender_id).await.value(),
        dec!(1000)
    );
}

#[tokio::test]
async fn test_insufficient_balance_counts_the_fee() {
    let f = fixture();

    // 1000 covers the amount but not amount + fee (1000 + 10).
    let err = f
        .ledger
        .transfer_p2p(f.sender_id, RECEIVER_PHONE, amount(dec!(1000)), common::PIN)
        .await
        .unwrap_err();

    assert_eq!(err, LedgerError::InsufficientBalance);
    assert_eq!(
        user_balance(&f.store, f.sender_id).await.value(),
        dec!(1000)
    );
}

#[tokio::test]
async fn test_failed_transfer_still_audited() {
    let f = fixture();

    let _ = f
        .ledger
        .transfer_p2p(f.sender_id, RECEIVER_PHONE, amount(dec!(100)), "0000")
        .await;

    let events = f.audit_store.events().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, AuditStatus::Failed);
    assert_eq!(events[0].reason.as_deref(), Some("Invalid PIN"));
    assert_eq!(events[0].sender_phone.as_deref(), Some(SENDER_PHONE));
    // No transaction record for a failed attempt.
    assert!(f.ledger.user_transactions(f.sender_id).await.unwrap().is_empty());
}
