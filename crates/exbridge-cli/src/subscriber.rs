//! Subscriber that reports key availability in the server log.

use crate::http::API_PREFIX;
use exbridge_core::{KeySubscriber, SubscriberResult};
use serde_json::Value;

#[derive(Debug, Default)]
pub struct RouteLogSubscriber;

impl KeySubscriber for RouteLogSubscriber {
    fn on_key_added(&self, key: &str, _value: &Value) -> SubscriberResult {
        tracing::info!(key = %key, route = %format!("{}/{}", API_PREFIX, key), "key available");
        Ok(())
    }

    fn on_key_changed(&self, key: &str, _value: &Value) -> SubscriberResult {
        tracing::debug!(key = %key, "key changed");
        Ok(())
    }

    fn on_key_removed(&self, key: &str) -> SubscriberResult {
        tracing::info!(key = %key, "key no longer available");
        Ok(())
    }
}
