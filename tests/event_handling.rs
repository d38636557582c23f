//! Observed event handling through the subscription pump.

use alloy::primitives::{Address, Bytes};
use std::time::Duration;

use age_gate::blockchain::{LedgerCall, ObservedEvent, ProviderNotice};
use age_gate::orchestrator::{
    encode_value, Classification, ConnectionStatus, EventReport, OperationKind,
};
use age_gate::status::Severity;

mod common;
use common::{ConfirmBehavior, MockLedger, RecordingSink, SEPOLIA};

fn event(subject: Address, payload: Bytes, tx: u8) -> ObservedEvent {
    ObservedEvent {
        subject,
        payload,
        tx_hash: Some(common::tx_hash(tx)),
    }
}

async fn next_result(sink: &RecordingSink, seen: usize) -> EventReport {
    assert!(
        common::eventually(|| sink.results().len() > seen).await,
        "no result notification"
    );
    sink.results()[seen].clone()
}

#[tokio::test]
async fn test_encoded_values_classified_through_stream() {
    let ledger = MockLedger::new(SEPOLIA);
    let sink = RecordingSink::new();
    let orchestrator = common::orchestrator(&ledger, &sink, common::settings());
    orchestrator.connect().await.unwrap();

    ledger
        .emit(ProviderNotice::Event(event(common::account(), encode_value(25), 1)))
        .await;
    let EventReport::Result(adult) = next_result(&sink, 0).await else {
        panic!("expected a classified result");
    };
    assert_eq!(adult.classification, Classification::Adult);
    assert_eq!(adult.decoded.as_str(), "encrypted:25");
    assert_eq!(adult.tx_hash, Some(common::tx_hash(1)));
    assert!(adult.own_account);

    let stranger = Address::repeat_byte(0x42);
    ledger
        .emit(ProviderNotice::Event(event(stranger, encode_value(17), 2)))
        .await;
    let EventReport::Result(minor) = next_result(&sink, 1).await else {
        panic!("expected a classified result");
    };
    assert_eq!(minor.classification, Classification::NotAdult);
    assert_eq!(minor.subject, stranger);
    assert!(!minor.own_account);
}

#[tokio::test]
async fn test_invalid_text_payload_degrades() {
    let ledger = MockLedger::new(SEPOLIA);
    let sink = RecordingSink::new();
    let orchestrator = common::orchestrator(&ledger, &sink, common::settings());
    orchestrator.connect().await.unwrap();

    ledger
        .emit(ProviderNotice::Event(event(
            common::account(),
            Bytes::from_static(&[0xff, 0xfe, 0xfd]),
            3,
        )))
        .await;

    let EventReport::Result(notice) = next_result(&sink, 0).await else {
        panic!("expected a classified result");
    };
    assert_eq!(notice.decoded.as_str(), "non-text");
    assert_eq!(notice.classification, Classification::Unknown);
    assert_eq!(orchestrator.state().status, ConnectionStatus::Connected);
}

#[tokio::test]
async fn test_malformed_log_reports_unparseable() {
    let ledger = MockLedger::new(SEPOLIA);
    let sink = RecordingSink::new();
    let orchestrator = common::orchestrator(&ledger, &sink, common::settings());
    orchestrator.connect().await.unwrap();

    ledger
        .emit(ProviderNotice::Malformed {
            tx_hash: Some(common::tx_hash(4)),
            reason: "data too short".into(),
        })
        .await;

    let report = next_result(&sink, 0).await;
    assert!(matches!(report, EventReport::Unparseable { .. }));
    assert_eq!(report.classification(), Classification::Unknown);
    assert!(sink
        .status_lines()
        .iter()
        .any(|s| s.severity == Severity::Error
            && s.text == "Received event but failed to parse result."));

    // The stream keeps delivering afterwards.
    ledger
        .emit(ProviderNotice::Event(event(common::account(), encode_value(40), 5)))
        .await;
    assert_eq!(next_result(&sink, 1).await.classification(), Classification::Adult);
}

#[tokio::test]
async fn test_on_event_direct_call() {
    let ledger = MockLedger::new(SEPOLIA);
    let sink = RecordingSink::new();
    let orchestrator = common::orchestrator(&ledger, &sink, common::settings());

    for (payload, expected) in [
        ("encrypted:", Classification::Unknown),
        ("garbage", Classification::Unknown),
        ("", Classification::Unknown),
        ("encrypted:18", Classification::Adult),
        ("encrypted:17", Classification::NotAdult),
    ] {
        let report = orchestrator.on_event(&event(
            Address::ZERO,
            Bytes::copy_from_slice(payload.as_bytes()),
            6,
        ));
        assert_eq!(report.classification(), expected, "{:?}", payload);
    }
    assert_eq!(sink.results().len(), 5);
}

#[tokio::test]
async fn test_event_during_pending_submission() {
    let ledger = MockLedger::new(SEPOLIA);
    ledger.set_confirm(ConfirmBehavior::Gated);
    let sink = RecordingSink::new();
    let orchestrator = common::orchestrator(&ledger, &sink, common::settings());
    orchestrator.connect().await.unwrap();

    let submitting = orchestrator.clone();
    let handle = common::background(async move {
        submitting
            .submit(LedgerCall::RequestCheck(common::account()))
            .await
    });

    let observer = orchestrator.clone();
    assert!(common::eventually(|| observer.pending(OperationKind::RequestCheck).is_some()).await);

    ledger
        .emit(ProviderNotice::Event(event(common::account(), encode_value(30), 7)))
        .await;
    assert_eq!(next_result(&sink, 0).await.classification(), Classification::Adult);

    // The event did not touch the in-flight operation.
    assert!(orchestrator.pending(OperationKind::RequestCheck).is_some());

    ledger.release();
    let outcome = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcome.operation.kind, OperationKind::RequestCheck);
}
