//! Change notifier.
//!
//! Fans the entries of an applied [`KeyDiff`] out to registered subscribers.
//!
//! ## Delivery contract
//!
//! - One call to [`ChangeNotifier::notify`] per applied diff, issued after
//!   the store has published the new snapshot.
//! - Events go out as Added, then Changed, then Removed; keys ascend within
//!   each category. Each subscriber sees the events in that order.
//! - A subscriber that returns an error or panics is reported as a
//!   `SubscriberFailure` and skipped for that one event only; remaining
//!   events and subscribers are still delivered.
//! - Subscribing or unsubscribing from inside a handler is allowed and takes
//!   effect from the next diff.

use crate::diff::model::{KeyChange, KeyDiff};
use crate::errors::BridgeError;
use crate::log_op_error;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Error a subscriber reports back to the notifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberError {
    message: String,
}

impl SubscriberError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for SubscriberError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SubscriberError {}

impl From<String> for SubscriberError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for SubscriberError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

pub type SubscriberResult = std::result::Result<(), SubscriberError>;

/// Receiver of key change events.
///
/// All methods default to doing nothing, so implementors only override the
/// events they care about.
pub trait KeySubscriber: Send + Sync {
    fn on_key_added(&self, _key: &str, _value: &Value) -> SubscriberResult {
        Ok(())
    }

    fn on_key_changed(&self, _key: &str, _value: &Value) -> SubscriberResult {
        Ok(())
    }

    fn on_key_removed(&self, _key: &str) -> SubscriberResult {
        Ok(())
    }
}

/// Handle returned by every registration; pass to [`ChangeNotifier::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Outcome of delivering one diff
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotifyReport {
    /// Key events emitted (Added + Changed + Removed)
    pub events: usize,
    /// Successful subscriber callbacks
    pub delivered: usize,
    /// One `SubscriberFailed` per failed callback, in delivery order
    pub failures: Vec<BridgeError>,
}

impl NotifyReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

type SubscriberList = Vec<(SubscriptionId, Arc<dyn KeySubscriber>)>;

/// Process-wide subscriber registry and event fan-out.
pub struct ChangeNotifier {
    next_id: AtomicU64,
    // Replaced wholesale on (un)subscribe so delivery can iterate without holding the lock
    subscribers: RwLock<Arc<SubscriberList>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Register a subscriber for all three event kinds
    pub fn subscribe(&self, subscriber: Arc<dyn KeySubscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut guard = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut list: SubscriberList = guard.as_ref().clone();
        list.push((id, subscriber));
        *guard = Arc::new(list);
        tracing::debug!(subscription = %id, "subscriber registered");
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut guard = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !guard.iter().any(|(existing, _)| *existing == id) {
            return false;
        }
        let list: SubscriberList = guard
            .iter()
            .filter(|(existing, _)| *existing != id)
            .cloned()
            .collect();
        *guard = Arc::new(list);
        tracing::debug!(subscription = %id, "subscriber removed");
        true
    }

    /// Register a closure for Added events
    pub fn on_key_added<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&str, &Value) -> SubscriberResult + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(OnAdded(f)))
    }

    /// Register a closure for Changed events
    pub fn on_key_changed<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&str, &Value) -> SubscriberResult + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(OnChanged(f)))
    }

    /// Register a closure for Removed events
    pub fn on_key_removed<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&str) -> SubscriberResult + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(OnRemoved(f)))
    }

    pub fn subscriber_count(&self) -> usize {
        self.current_subscribers().len()
    }

    /// Deliver every change of `diff` to every subscriber.
    ///
    /// An empty diff delivers nothing. Never fails: subscriber failures are
    /// logged and collected in the report.
    pub fn notify(&self, diff: &KeyDiff) -> NotifyReport {
        let mut report = NotifyReport::default();
        if diff.is_empty() {
            return report;
        }

        let start = Instant::now();
        let subscribers = self.current_subscribers();

        for change in diff.changes() {
            report.events += 1;
            for (id, subscriber) in subscribers.iter() {
                match deliver(subscriber.as_ref(), &change) {
                    Ok(()) => report.delivered += 1,
                    Err(reason) => {
                        let err = BridgeError::SubscriberFailed {
                            subscription: id.as_u64(),
                            key: change.key().to_string(),
                            reason,
                        };
                        log_op_error!(
                            "notify",
                            err.clone(),
                            duration_ms = start.elapsed().as_millis() as u64,
                            key = change.key(),
                            change = change.kind().as_str(),
                            subscription = %id,
                        );
                        report.failures.push(err);
                    }
                }
            }
        }

        report
    }

    fn current_subscribers(&self) -> Arc<SubscriberList> {
        self.subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Invoke the matching callback, converting both errors and panics into a reason string.
fn deliver(subscriber: &dyn KeySubscriber, change: &KeyChange<'_>) -> Result<(), String> {
    let outcome = catch_unwind(AssertUnwindSafe(|| match *change {
        KeyChange::Added { key, value } => subscriber.on_key_added(key, value),
        KeyChange::Changed { key, value } => subscriber.on_key_changed(key, value),
        KeyChange::Removed { key } => subscriber.on_key_removed(key),
    }));

    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(err.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("subscriber panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("subscriber panicked: {}", s)
    } else {
        "subscriber panicked".to_string()
    }
}

struct OnAdded<F>(F);

impl<F> KeySubscriber for OnAdded<F>
where
    F: Fn(&str, &Value) -> SubscriberResult + Send + Sync,
{
    fn on_key_added(&self, key: &str, value: &Value) -> SubscriberResult {
        (self.0)(key, value)
    }
}

struct OnChanged<F>(F);

impl<F> KeySubscriber for OnChanged<F>
where
    F: Fn(&str, &Value) -> SubscriberResult + Send + Sync,
{
    fn on_key_changed(&self, key: &str, value: &Value) -> SubscriberResult {
        (self.0)(key, value)
    }
}

struct OnRemoved<F>(F);

impl<F> KeySubscriber for OnRemoved<F>
where
    F: Fn(&str) -> SubscriberResult + Send + Sync,
{
    fn on_key_removed(&self, key: &str) -> SubscriberResult {
        (self.0)(key)
    }
}
