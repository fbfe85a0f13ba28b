//! Integration tests for the transaction lifecycle.
//!
//! # Purpose
//!
//! These tests drive a running coordinator through its public handle while
//! playing the reader: every status report goes through the
//! `TransactionReporter` the SDK received, exactly as a real SDK callback
//! would.  They verify:
//!
//! - The status only moves on reader reports and returns to `Idle` on its own
//!   two seconds after a terminal result.
//! - Cancellation returns to `Idle` at once and a late result from the
//!   cancelled attempt is discarded.
//! - Losing the reader ends the attempt in flight as `Failed`, so the
//!   terminal never stays blocked on a reader that will not report again.
//! - A new transaction started during the two-second window is not clobbered
//!   by the previous attempt's reset.
//! - Request building: amount truncation and split-transfer legs.
//!
//! Time is paused (`start_paused = true`), so the two-second reset elapses
//! instantly and deterministically once the runtime is idle.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::TestTerminal;
use mpos_core::{
    Generation, MinorUnits, SdkConnectionEvent, SplitTransferEntry, TransactionKind,
    TransactionStatus,
};
use mpos_terminal::application::edit_session::OthersEdit;
use mpos_terminal::application::payment_sdk::{DeviceEvent, ReaderStatus, ReaderUpdate};
use mpos_terminal::application::run_transaction::{TransactionError, AUTO_RESET_DELAY};
use mpos_terminal::infrastructure::coordinator::TerminalError;
use mpos_terminal::infrastructure::storage::medium::InMemoryMedium;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

async fn terminal() -> TestTerminal {
    TestTerminal::start(Arc::new(InMemoryMedium::new())).await
}

fn status(s: ReaderStatus) -> ReaderUpdate {
    ReaderUpdate::Status(s)
}

fn approved(id: &str) -> ReaderUpdate {
    status(ReaderStatus::Approved {
        transfer_id: id.to_string(),
    })
}

// ── Happy path ────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_sale_runs_through_reader_states_and_resets_after_delay() {
    // Arrange
    let t = terminal().await;

    // Act: submit; nothing moves until the reader reports.
    let generation = assert_ok!(t.handle.start_transaction(TransactionKind::Sale, "3.14").await);
    assert_eq!(t.handle.projection().transaction_status, TransactionStatus::Idle);
    let (request, reporter) = t.sdk.transaction(0);

    // Assert
    assert_eq!(request.amount, MinorUnits(314));
    assert_eq!(reporter.generation(), generation);

    reporter.report(status(ReaderStatus::ReadingCard));
    t.handle
        .wait_for(|p| p.transaction_status == TransactionStatus::ReadingCard)
        .await
        .unwrap();

    reporter.report(status(ReaderStatus::ProcessingCard));
    t.handle
        .wait_for(|p| p.transaction_status == TransactionStatus::ProcessingCard)
        .await
        .unwrap();

    reporter.report(approved("tx1"));
    let done = t
        .handle
        .wait_for(|p| p.transaction_status.is_terminal())
        .await
        .unwrap();
    let finished_at = Instant::now();
    assert_eq!(done.transaction_status, TransactionStatus::Success("tx1".into()));
    assert_eq!(done.last_transfer_id.as_deref(), Some("tx1"));
    assert!(done.log_messages().any(|m| m == "Transaction approved: tx1"));

    let reset = t
        .handle
        .wait_for(|p| p.transaction_status == TransactionStatus::Idle)
        .await
        .unwrap();
    assert!(finished_at.elapsed() >= AUTO_RESET_DELAY);
    assert_eq!(reset.last_transfer_id.as_deref(), Some("tx1"));
}

#[tokio::test(start_paused = true)]
async fn test_failure_is_shown_then_reset() {
    let t = terminal().await;
    assert_ok!(t.handle.start_transaction(TransactionKind::Auth, "10").await);
    let (_, reporter) = t.sdk.transaction(0);

    reporter.report(status(ReaderStatus::Failed {
        error: "Card declined".into(),
    }));

    let failed = t
        .handle
        .wait_for(|p| p.transaction_status.is_terminal())
        .await
        .unwrap();
    assert_eq!(
        failed.transaction_status,
        TransactionStatus::Failed("Card declined".into())
    );
    assert_eq!(failed.last_transfer_id, None);
    t.handle
        .wait_for(|p| p.transaction_status == TransactionStatus::Idle)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_terminal_event_without_prior_states_is_authoritative() {
    let t = terminal().await;
    assert_ok!(t.handle.start_transaction(TransactionKind::Sale, "1").await);
    let (_, reporter) = t.sdk.transaction(0);

    reporter.report(approved("tx-direct"));

    let done = t
        .handle
        .wait_for(|p| p.transaction_status.is_terminal())
        .await
        .unwrap();
    assert_eq!(done.transaction_status, TransactionStatus::Success("tx-direct".into()));
}

// ── Rejections ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_invalid_amount_is_rejected_without_reaching_the_sdk() {
    // Arrange
    let t = terminal().await;

    // Act
    let err = assert_err!(t.handle.start_transaction(TransactionKind::Sale, "abc").await);

    // Assert
    assert!(matches!(
        err,
        TerminalError::Transaction(TransactionError::InvalidAmount(_))
    ));
    assert_eq!(err.user_message(), "Enter a transaction amount");
    assert_eq!(t.sdk.transaction_count(), 0);
    assert_eq!(t.handle.projection().transaction_status, TransactionStatus::Idle);
}

#[tokio::test]
async fn test_second_start_while_in_flight_is_rejected() {
    let t = terminal().await;
    let first = assert_ok!(t.handle.start_transaction(TransactionKind::Sale, "1").await);

    let err = assert_err!(t.handle.start_transaction(TransactionKind::Sale, "2").await);

    assert!(matches!(
        err,
        TerminalError::Transaction(TransactionError::AlreadyInFlight(g)) if g == first
    ));
    assert_eq!(t.sdk.transaction_count(), 1);
}

// ── Cancellation and stale results ────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_cancel_returns_to_idle_and_late_success_is_discarded() {
    // Arrange
    let t = terminal().await;
    assert_ok!(t.handle.start_transaction(TransactionKind::Sale, "5").await);
    let (_, reporter) = t.sdk.transaction(0);
    reporter.report(status(ReaderStatus::ReadingCard));
    t.handle
        .wait_for(|p| p.transaction_status == TransactionStatus::ReadingCard)
        .await
        .unwrap();

    // Act
    assert_ok!(t.handle.cancel_transaction().await);
    reporter.report(approved("tx-late"));
    t.drain_events().await;

    // Assert
    let p = t.handle.projection();
    assert_eq!(p.transaction_status, TransactionStatus::Idle);
    assert_eq!(p.last_transfer_id, None);
    assert!(t.sdk.calls().contains(&"stop_current_operation".to_string()));
    assert!(p.log_messages().any(|m| m == "Transaction cancelled"));
}

#[tokio::test]
async fn test_cancel_before_reader_reports_is_rejected() {
    let t = terminal().await;
    assert_ok!(t.handle.start_transaction(TransactionKind::Sale, "5").await);

    let err = assert_err!(t.handle.cancel_transaction().await);

    assert!(matches!(
        err,
        TerminalError::Transaction(TransactionError::NothingToCancel)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_reader_disconnect_before_first_report_fails_the_attempt() {
    // Arrange
    let t = terminal().await;
    let first = assert_ok!(t.handle.start_transaction(TransactionKind::Sale, "5").await);
    let (_, reporter) = t.sdk.transaction(0);

    // Act
    t.events
        .device(DeviceEvent::Connection(SdkConnectionEvent::Disconnected));
    let failed = t
        .handle
        .wait_for(|p| p.transaction_status.is_terminal())
        .await
        .unwrap();

    // Assert
    assert_eq!(
        failed.transaction_status,
        TransactionStatus::Failed("Device disconnected".into())
    );
    assert_eq!(failed.in_flight, None);
    assert!(failed
        .log_messages()
        .any(|m| m == "Transaction failed: Device disconnected"));

    reporter.report(approved("tx-late"));
    t.handle
        .wait_for(|p| p.transaction_status == TransactionStatus::Idle)
        .await
        .unwrap();
    assert_eq!(t.handle.projection().last_transfer_id, None);

    let next = assert_ok!(t.handle.start_transaction(TransactionKind::Sale, "5").await);
    assert!(next > first);
}

#[tokio::test(start_paused = true)]
async fn test_connection_error_mid_read_fails_the_attempt() {
    let t = terminal().await;
    assert_ok!(t.handle.start_transaction(TransactionKind::Sale, "5").await);
    let (_, reporter) = t.sdk.transaction(0);
    reporter.report(status(ReaderStatus::ReadingCard));
    t.handle
        .wait_for(|p| p.transaction_status == TransactionStatus::ReadingCard)
        .await
        .unwrap();

    t.events
        .device(DeviceEvent::Connection(SdkConnectionEvent::Error("timeout".into())));

    let failed = t
        .handle
        .wait_for(|p| p.transaction_status.is_terminal())
        .await
        .unwrap();
    assert_eq!(
        failed.transaction_status,
        TransactionStatus::Failed("Device connection error: timeout".into())
    );
    assert_ok!(t.handle.start_transaction(TransactionKind::Sale, "1").await);
}

#[tokio::test]
async fn test_disconnect_while_idle_leaves_status_alone() {
    let t = terminal().await;

    t.events
        .device(DeviceEvent::Connection(SdkConnectionEvent::Disconnected));
    t.drain_events().await;

    let p = t.handle.projection();
    assert_eq!(p.transaction_status, TransactionStatus::Idle);
    assert!(!p.log_messages().any(|m| m.starts_with("Transaction failed")));
}

#[tokio::test(start_paused = true)]
async fn test_new_transaction_supersedes_pending_reset() {
    // Arrange: first attempt approved, reset timer pending.
    let t = terminal().await;
    let first = assert_ok!(t.handle.start_transaction(TransactionKind::Sale, "1").await);
    let (_, first_reporter) = t.sdk.transaction(0);
    first_reporter.report(approved("tx1"));
    t.handle
        .wait_for(|p| p.transaction_status.is_terminal())
        .await
        .unwrap();

    // Act: start again inside the window and let the reader begin.
    let second = assert_ok!(t.handle.start_transaction(TransactionKind::Sale, "2").await);
    let (_, second_reporter) = t.sdk.transaction(1);
    second_reporter.report(status(ReaderStatus::ReadingCard));
    t.handle
        .wait_for(|p| p.transaction_status == TransactionStatus::ReadingCard)
        .await
        .unwrap();
    tokio::time::sleep(AUTO_RESET_DELAY + Duration::from_millis(100)).await;
    t.drain_events().await;

    // Assert: the first attempt's reset did not clobber the new state.
    assert!(second > first);
    assert_eq!(second, Generation(first.0 + 1));
    assert_eq!(
        t.handle.projection().transaction_status,
        TransactionStatus::ReadingCard
    );
}

#[tokio::test(start_paused = true)]
async fn test_prompts_from_reader_reach_the_activity_log() {
    let t = terminal().await;
    assert_ok!(t.handle.start_transaction(TransactionKind::Refund, "1").await);
    let (_, reporter) = t.sdk.transaction(0);

    reporter.report(ReaderUpdate::Prompt("Insert, tap or swipe card".into()));
    reporter.report(ReaderUpdate::CardRemoved);
    t.drain_events().await;

    let messages: Vec<String> = t.handle.projection().log_messages().map(str::to_string).collect();
    assert!(messages.contains(&"Insert, tap or swipe card".to_string()));
    assert!(messages.contains(&"Card removed".to_string()));
}

// ── Request building ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_split_transfers_and_tags_are_forwarded_in_order() {
    // Arrange
    let t = terminal().await;
    let entry = |merchant: &str, amount: &str, fee: &str| SplitTransferEntry {
        merchant_id: merchant.to_string(),
        amount: amount.to_string(),
        fee: fee.to_string(),
        ..SplitTransferEntry::new()
    };
    assert_ok!(
        t.handle
            .save_others(OthersEdit {
                enable_split_transfers: true,
                split_transfer_entries: vec![entry("MU1", "1.505", "0.05"), entry("MU2", "1.64", "")],
                tags_string: "order:42, lane:3".to_string(),
            })
            .await
    );

    // Act
    assert_ok!(t.handle.start_transaction(TransactionKind::Sale, "3.14").await);

    // Assert
    let (request, _) = t.sdk.transaction(0);
    let legs = request.split_transfers.expect("split legs");
    assert_eq!(legs.len(), 2);
    assert_eq!(legs[0].merchant_id, "MU1");
    assert_eq!(legs[0].amount, MinorUnits(150));
    assert_eq!(legs[0].fee, Some(MinorUnits(5)));
    assert_eq!(legs[1].merchant_id, "MU2");
    assert_eq!(legs[1].amount, MinorUnits(164));
    let tags = request.tags.expect("tags");
    assert_eq!(tags["order"], "42");
    assert_eq!(tags["lane"], "3");
}

#[tokio::test]
async fn test_amount_is_truncated_not_rounded() {
    let t = terminal().await;

    assert_ok!(t.handle.start_transaction(TransactionKind::Sale, "3.149").await);

    assert_eq!(t.sdk.transaction(0).0.amount, MinorUnits(314));
}
