//! Read-only query surface handed to the HTTP layer.
//!
//! A thin pass-through to the [`SnapshotStore`]; it exposes no way to
//! mutate the table.

use crate::errors::{BridgeError, Result};
use crate::snapshot::model::Snapshot;
use crate::store::SnapshotStore;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct QueryInterface {
    store: Arc<SnapshotStore>,
}

impl QueryInterface {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }

    /// Current value of `key`.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` when the live snapshot has no such key.
    pub fn get_current_entry(&self, key: &str) -> Result<Value> {
        self.store.get(key).ok_or_else(|| BridgeError::KeyNotFound {
            key: key.to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.snapshot_all().contains_key(key)
    }

    /// Point-in-time view of every entry
    pub fn snapshot_all(&self) -> Arc<Snapshot> {
        self.store.snapshot_all()
    }

    /// Keys of the live snapshot in ascending order
    pub fn keys(&self) -> Vec<String> {
        self.store.snapshot_all().keys().map(str::to_string).collect()
    }

    pub fn version(&self) -> u64 {
        self.store.version()
    }
}
