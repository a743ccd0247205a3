//! Key diff output types.
//!
//! All collections are `BTreeMap`/`BTreeSet` so that serialization and
//! event order are deterministic (keys ascend within each category).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Classification of top-level keys between two snapshots.
///
/// The three key sets are disjoint. Unchanged keys are not reported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct KeyDiff {
    /// Keys present only in the new document, with their values
    pub added: BTreeMap<String, Value>,
    /// Keys present in both with structurally different values, with the new value
    pub changed: BTreeMap<String, Value>,
    /// Keys present only in the previous snapshot
    pub removed: BTreeSet<String>,
}

impl KeyDiff {
    /// True when applying this diff would change nothing
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }

    /// Total number of key changes
    pub fn len(&self) -> usize {
        self.added.len() + self.changed.len() + self.removed.len()
    }

    pub fn counts(&self) -> DiffCounts {
        DiffCounts {
            added: self.added.len(),
            changed: self.changed.len(),
            removed: self.removed.len(),
        }
    }

    /// Changes in notification order: Added, then Changed, then Removed,
    /// each category in ascending key order.
    pub fn changes(&self) -> impl Iterator<Item = KeyChange<'_>> {
        let added = self
            .added
            .iter()
            .map(|(key, value)| KeyChange::Added { key, value });
        let changed = self
            .changed
            .iter()
            .map(|(key, value)| KeyChange::Changed { key, value });
        let removed = self.removed.iter().map(|key| KeyChange::Removed { key });
        added.chain(changed).chain(removed)
    }
}

/// Per-category sizes of a [`KeyDiff`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DiffCounts {
    pub added: usize,
    pub changed: usize,
    pub removed: usize,
}

/// Category of a single key change
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Changed,
    Removed,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Changed => "changed",
            ChangeKind::Removed => "removed",
        }
    }
}

/// One entry of a [`KeyDiff`], borrowed from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyChange<'a> {
    Added { key: &'a str, value: &'a Value },
    Changed { key: &'a str, value: &'a Value },
    Removed { key: &'a str },
}

impl<'a> KeyChange<'a> {
    pub fn key(&self) -> &'a str {
        match self {
            KeyChange::Added { key, .. }
            | KeyChange::Changed { key, .. }
            | KeyChange::Removed { key } => key,
        }
    }

    /// New value for Added/Changed, `None` for Removed
    pub fn value(&self) -> Option<&'a Value> {
        match self {
            KeyChange::Added { value, .. } | KeyChange::Changed { value, .. } => Some(value),
            KeyChange::Removed { .. } => None,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            KeyChange::Added { .. } => ChangeKind::Added,
            KeyChange::Changed { .. } => ChangeKind::Changed,
            KeyChange::Removed { .. } => ChangeKind::Removed,
        }
    }
}
