//! Structured logging of the ingest and notify operations.
//!
//! The capture layer is process-global, so each test tags its work with a
//! unique blob (matched by digest) or a unique key.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use exbridge_core::errors::BridgeError;
use exbridge_core::logging_facility::test_capture::{init_test_capture, CapturedEvent, TestCapture};
use exbridge_core::snapshot::content_digest;
use exbridge_core::{
    log_op_end, log_op_error, ChangeNotifier, IngestPipeline, SnapshotStore, SubscriberError,
};
use exbridge_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use std::sync::Arc;

fn pipeline_with(notifier: ChangeNotifier) -> IngestPipeline {
    IngestPipeline::new(Arc::new(SnapshotStore::new(Arc::new(notifier))))
}

/// Ingest events belonging to one blob
fn ingest_events(capture: &TestCapture, raw: &str) -> Vec<CapturedEvent> {
    let digest = content_digest(raw.as_bytes());
    capture
        .events_for_op("ingest")
        .into_iter()
        .filter(|e| e.field("content_digest") == Some(&digest[..12]))
        .collect()
}

fn with_event<'a>(events: &'a [CapturedEvent], name: &str) -> Vec<&'a CapturedEvent> {
    events
        .iter()
        .filter(|e| e.event.as_deref() == Some(name))
        .collect()
}

#[test]
fn test_ingest_emits_one_start_and_one_end() {
    let capture = init_test_capture();
    let pipeline = pipeline_with(ChangeNotifier::new());
    let raw = r#"{"ingest-start-end":1}"#;

    pipeline.ingest(raw).unwrap();

    let events = ingest_events(&capture, raw);
    assert_eq!(with_event(&events, EVENT_START).len(), 1);
    assert!(with_event(&events, EVENT_END_ERROR).is_empty());

    let ends = with_event(&events, EVENT_END);
    assert_eq!(ends.len(), 1, "Should have exactly one end event");
    let end = ends[0];
    assert_eq!(end.component.as_deref(), Some("exbridge_core::pipeline"));
    assert!(end.field("duration_ms").is_some());
    assert_eq!(end.field("snapshot_version"), Some("1"));
    assert_eq!(end.field("added"), Some("1"));
    assert_eq!(end.field("changed"), Some("0"));
    assert_eq!(end.field("removed"), Some("0"));
    assert_eq!(end.field("subscriber_failures"), Some("0"));
}

#[test]
fn test_ingest_start_records_blob_size() {
    let capture = init_test_capture();
    let pipeline = pipeline_with(ChangeNotifier::new());
    let raw = r#"{"ingest-size":[1,2,3]}"#;

    pipeline.ingest(raw).unwrap();

    let events = ingest_events(&capture, raw);
    let start = with_event(&events, EVENT_START)[0];
    assert_eq!(start.field("bytes"), Some(raw.len().to_string().as_str()));
    assert_eq!(start.component.as_deref(), Some("exbridge_core::pipeline"));
}

#[test]
fn test_malformed_ingest_ends_with_error() {
    // Scenario: a truncated blob reaches the pipeline
    // Then: start is paired with end_error (never end) carrying the error code
    let capture = init_test_capture();
    let pipeline = pipeline_with(ChangeNotifier::new());
    let raw = r#"{"ingest-malformed":"#;

    pipeline.ingest(raw).unwrap_err();

    let events = ingest_events(&capture, raw);
    assert_eq!(with_event(&events, EVENT_START).len(), 1);
    assert!(with_event(&events, EVENT_END).is_empty());

    let errors = with_event(&events, EVENT_END_ERROR);
    assert_eq!(errors.len(), 1);
    let error = errors[0];
    assert_eq!(error.field("err.code"), Some("ERR_MALFORMED"));
    assert_eq!(error.field("err.kind"), Some("Malformed"));
    assert!(error.field("duration_ms").is_some());
    assert!(error.field("message").is_some_and(|m| m.contains("line 1")));
}

#[test]
fn test_non_object_ingest_logs_invalid_shape() {
    let capture = init_test_capture();
    let pipeline = pipeline_with(ChangeNotifier::new());
    let raw = r#"["ingest-invalid-shape"]"#;

    pipeline.ingest(raw).unwrap_err();

    let events = ingest_events(&capture, raw);
    let errors = with_event(&events, EVENT_END_ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field("err.code"), Some("ERR_INVALID_SHAPE"));
}

#[test]
fn test_subscriber_failure_logged_under_notify() {
    // Scenario: a subscriber rejects an added key during ingest
    // Then: a notify end_error names the key and the change kind,
    //       and the ingest still ends normally with the failure counted
    let capture = init_test_capture();
    let notifier = ChangeNotifier::new();
    notifier.on_key_added(|key, _| {
        if key == "notify-rejected" {
            Err(SubscriberError::new("handler rejected value"))
        } else {
            Ok(())
        }
    });
    let pipeline = pipeline_with(notifier);
    let raw = r#"{"notify-accepted":1,"notify-rejected":2}"#;

    pipeline.ingest(raw).unwrap();

    let notify_errors: Vec<_> = capture
        .events_for_op("notify")
        .into_iter()
        .filter(|e| e.field("key") == Some("notify-rejected"))
        .collect();
    assert_eq!(notify_errors.len(), 1);
    let error = &notify_errors[0];
    assert_eq!(error.event.as_deref(), Some(EVENT_END_ERROR));
    assert_eq!(error.field("err.code"), Some("ERR_SUBSCRIBER_FAILURE"));
    assert_eq!(error.field("change"), Some("added"));
    assert_eq!(error.component.as_deref(), Some("exbridge_core::notifier"));
    assert!(error
        .field("message")
        .is_some_and(|m| m.contains("handler rejected value")));

    assert_eq!(
        capture.count_events(|e| {
            e.op.as_deref() == Some("notify") && e.field("key") == Some("notify-accepted")
        }),
        0
    );

    let events = ingest_events(&capture, raw);
    let end = with_event(&events, EVENT_END)[0];
    assert_eq!(end.field("subscriber_failures"), Some("1"));
}

#[test]
fn test_log_op_end_records_fields() {
    let capture = init_test_capture();
    let op_name = "log_op_end_fields_check";

    log_op_end!(op_name, duration_ms = 42, snapshot_version = 7_u64);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_END));
    assert_eq!(events[0].field("duration_ms"), Some("42"));
    assert_eq!(events[0].field("snapshot_version"), Some("7"));
}

#[test]
fn test_log_op_error_maps_bridge_error_code() {
    let capture = init_test_capture();
    let op_name = "log_op_error_code_check";

    let err = BridgeError::KeyNotFound {
        key: "signals".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 10);

    capture.assert_event_exists(op_name, EVENT_END_ERROR);
    let events = capture.events_for_op(op_name);
    assert_eq!(events[0].field("err.code"), Some("ERR_NOT_FOUND"));
}

#[test]
#[should_panic(expected = "Expected event")]
fn test_assert_event_exists_fails_for_missing_event() {
    let capture = init_test_capture();

    capture.assert_event_exists("op_that_never_logs", EVENT_START);
}
