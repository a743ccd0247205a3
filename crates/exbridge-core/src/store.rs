//! Snapshot store.
//!
//! The authoritative key → value table. The live [`Snapshot`] is held behind
//! an [`ArcSwap`]: readers load the current `Arc<Snapshot>` without locking,
//! the single writer builds the next snapshot off to the side and publishes
//! it with one atomic pointer swap. A reader therefore sees either the whole
//! of a diff or none of it.
//!
//! Writers are serialized by a mutex that is held across publication *and*
//! notification, so all events of one diff are delivered before the next
//! diff is applied. Subscribers must not call [`SnapshotStore::apply`] from
//! inside a handler (it would wait on the lock it is running under); reads
//! from handlers are fine and observe the new snapshot.

use crate::diff::model::KeyDiff;
use crate::notifier::{ChangeNotifier, NotifyReport};
use crate::snapshot::model::Snapshot;
use arc_swap::ArcSwap;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

/// Result of applying one diff
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    /// Version of the live snapshot after the apply
    pub version: u64,
    /// The diff that was applied
    pub diff: KeyDiff,
    /// Notification outcome (empty for an empty diff)
    pub report: NotifyReport,
}

impl ApplyOutcome {
    /// True if the apply published a new snapshot
    pub fn published(&self) -> bool {
        !self.diff.is_empty()
    }
}

pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
    write_lock: Mutex<()>,
    notifier: Arc<ChangeNotifier>,
}

impl SnapshotStore {
    /// Create an empty store (version 0) that notifies through `notifier`
    pub fn new(notifier: Arc<ChangeNotifier>) -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
            write_lock: Mutex::new(()),
            notifier,
        }
    }

    /// The notifier this store hands applied diffs to
    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    /// Current value for `key`, or `None` if the key is absent.
    ///
    /// Lock-free; safe to call concurrently with [`apply`](Self::apply).
    pub fn get(&self, key: &str) -> Option<Value> {
        self.current.load().get(key).cloned()
    }

    /// Point-in-time view of the whole table
    pub fn snapshot_all(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn version(&self) -> u64 {
        self.current.load().version()
    }

    /// Acquire the single-writer lock.
    ///
    /// Use this when the diff must be computed against the exact baseline it
    /// will be applied to.
    pub fn writer(&self) -> SnapshotWriter<'_> {
        let guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        SnapshotWriter {
            store: self,
            _guard: guard,
        }
    }

    /// Apply `diff` and notify subscribers.
    ///
    /// Equivalent to `self.writer().apply(diff)`.
    pub fn apply(&self, diff: KeyDiff) -> ApplyOutcome {
        self.writer().apply(diff)
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.current.load();
        f.debug_struct("SnapshotStore")
            .field("version", &snapshot.version())
            .field("keys", &snapshot.len())
            .finish()
    }
}

/// Exclusive write access to a [`SnapshotStore`]
pub struct SnapshotWriter<'a> {
    store: &'a SnapshotStore,
    _guard: MutexGuard<'a, ()>,
}

impl SnapshotWriter<'_> {
    /// The baseline the next apply will build on
    pub fn current(&self) -> Arc<Snapshot> {
        self.store.current.load_full()
    }

    /// Publish the snapshot produced by `diff`, then notify subscribers.
    ///
    /// An empty diff publishes nothing and fires no events. The lock is
    /// released when this returns.
    pub fn apply(self, diff: KeyDiff) -> ApplyOutcome {
        let base = self.store.current.load_full();
        if diff.is_empty() {
            return ApplyOutcome {
                version: base.version(),
                diff,
                report: NotifyReport::default(),
            };
        }

        let mut entries = base.entries().clone();
        for (key, value) in diff.added.iter().chain(diff.changed.iter()) {
            entries.insert(key.clone(), value.clone());
        }
        for key in &diff.removed {
            entries.remove(key);
        }

        let version = base.version() + 1;
        self.store
            .current
            .store(Arc::new(Snapshot::new(version, entries)));

        let counts = diff.counts();
        tracing::debug!(
            snapshot_version = version,
            added = counts.added,
            changed = counts.changed,
            removed = counts.removed,
            "snapshot published"
        );

        let report = self.store.notifier.notify(&diff);

        ApplyOutcome {
            version,
            diff,
            report,
        }
    }
}
