//! Change notifier delivery: order, payloads, failure isolation.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use exbridge_core::diff::KeyDiff;
use exbridge_core::errors::{BridgeError, ExErrorKind};
use exbridge_core::logging_facility::test_capture::init_test_capture;
use exbridge_core::notifier::{ChangeNotifier, KeySubscriber, SubscriberError, SubscriberResult};
use exbridge_core_types::schema::EVENT_END_ERROR;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Records every event as a readable line
#[derive(Default)]
struct Recorder {
    log: Mutex<Vec<String>>,
}

impl Recorder {
    fn lines(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl KeySubscriber for Recorder {
    fn on_key_added(&self, key: &str, value: &Value) -> SubscriberResult {
        self.log.lock().unwrap().push(format!("+{}={}", key, value));
        Ok(())
    }

    fn on_key_changed(&self, key: &str, value: &Value) -> SubscriberResult {
        self.log.lock().unwrap().push(format!("~{}={}", key, value));
        Ok(())
    }

    fn on_key_removed(&self, key: &str) -> SubscriberResult {
        self.log.lock().unwrap().push(format!("-{}", key));
        Ok(())
    }
}

fn mixed_diff() -> KeyDiff {
    let mut diff = KeyDiff::default();
    diff.added.insert("d".to_string(), json!(4));
    diff.added.insert("c".to_string(), json!(3));
    diff.changed.insert("a".to_string(), json!({"x": 1}));
    diff.removed.insert("b".to_string());
    diff
}

#[test]
fn test_events_delivered_in_category_then_key_order() {
    let notifier = ChangeNotifier::new();
    let recorder = Arc::new(Recorder::default());
    notifier.subscribe(recorder.clone());

    let report = notifier.notify(&mixed_diff());

    assert_eq!(
        recorder.lines(),
        vec!["+c=3", "+d=4", "~a={\"x\":1}", "-b"]
    );
    assert_eq!(report.events, 4);
    assert_eq!(report.delivered, 4);
    assert_eq!(report.failed(), 0);
}

#[test]
fn test_every_subscriber_receives_every_event() {
    let notifier = ChangeNotifier::new();
    let first = Arc::new(Recorder::default());
    let second = Arc::new(Recorder::default());
    notifier.subscribe(first.clone());
    notifier.subscribe(second.clone());

    let report = notifier.notify(&mixed_diff());

    assert_eq!(first.lines(), second.lines());
    assert_eq!(report.delivered, 8);
}

#[test]
fn test_closure_registration_filters_by_kind() {
    let notifier = ChangeNotifier::new();
    let removed = Arc::new(Mutex::new(Vec::new()));
    let sink = removed.clone();
    notifier.on_key_removed(move |key| {
        sink.lock().unwrap().push(key.to_string());
        Ok(())
    });

    notifier.notify(&mixed_diff());

    assert_eq!(*removed.lock().unwrap(), vec!["b".to_string()]);
}

#[test]
fn test_failing_subscriber_does_not_block_others() {
    let notifier = ChangeNotifier::new();
    let failing = notifier.on_key_added(|key, _| {
        if key == "c" {
            Err(SubscriberError::new("downstream unavailable"))
        } else {
            Ok(())
        }
    });
    let recorder = Arc::new(Recorder::default());
    notifier.subscribe(recorder.clone());

    let report = notifier.notify(&mixed_diff());

    assert_eq!(recorder.lines().len(), 4);
    assert_eq!(report.failed(), 1);
    match &report.failures[0] {
        BridgeError::SubscriberFailed {
            subscription,
            key,
            reason,
        } => {
            assert_eq!(*subscription, failing.as_u64());
            assert_eq!(key, "c");
            assert_eq!(reason, "downstream unavailable");
        }
        other => panic!("unexpected failure {:?}", other),
    }
    assert_eq!(report.failures[0].kind(), ExErrorKind::SubscriberFailure);
}

#[test]
fn test_panicking_subscriber_is_contained() {
    let notifier = ChangeNotifier::new();
    notifier.on_key_changed(|_, _| panic!("handler bug"));
    let recorder = Arc::new(Recorder::default());
    notifier.subscribe(recorder.clone());

    let report = notifier.notify(&mixed_diff());

    assert_eq!(recorder.lines().len(), 4);
    assert_eq!(report.failed(), 1);
    assert!(report.failures[0].to_string().contains("handler bug"));
}

#[test]
fn test_subscriber_failure_is_logged() {
    let capture = init_test_capture();
    let notifier = ChangeNotifier::new();
    notifier.on_key_added(|_, _| Err("rejected-by-logging-test".into()));

    let mut diff = KeyDiff::default();
    diff.added.insert("logged-key-unique".to_string(), json!(1));
    notifier.notify(&diff);

    let logged = capture.events_for_op("notify").into_iter().any(|e| {
        e.event.as_deref() == Some(EVENT_END_ERROR)
            && e.field("key") == Some("logged-key-unique")
            && e.field("err.code") == Some("ERR_SUBSCRIBER_FAILURE")
    });
    assert!(logged, "expected a notify error event for the failing key");
}

#[test]
fn test_unsubscribed_receives_nothing() {
    let notifier = ChangeNotifier::new();
    let recorder = Arc::new(Recorder::default());
    let id = notifier.subscribe(recorder.clone());
    assert!(notifier.unsubscribe(id));

    let report = notifier.notify(&mixed_diff());

    assert!(recorder.lines().is_empty());
    assert_eq!(report.events, 4);
    assert_eq!(report.delivered, 0);
}

#[test]
fn test_subscribe_from_handler_applies_to_next_diff() {
    let notifier = Arc::new(ChangeNotifier::new());
    let late = Arc::new(Recorder::default());

    let registry = Arc::downgrade(&notifier);
    let late_for_handler = late.clone();
    notifier.on_key_added(move |key, _| {
        if key == "c" {
            if let Some(notifier) = registry.upgrade() {
                notifier.subscribe(late_for_handler.clone());
            }
        }
        Ok(())
    });

    notifier.notify(&mixed_diff());
    assert!(late.lines().is_empty());

    let mut next = KeyDiff::default();
    next.removed.insert("d".to_string());
    notifier.notify(&next);
    assert_eq!(late.lines(), vec!["-d"]);
}
