//! Snapshot and document types.
//!
//! Both wrap a sorted key → value map so that iteration, serialization and
//! notification order are deterministic.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Sorted mapping from key to JSON value
pub type Entries = BTreeMap<String, Value>;

/// A parsed exchange document: the top-level members of a JSON object.
///
/// Produced by [`parse`](crate::snapshot::parser::parse); never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    entries: Entries,
}

impl Document {
    /// Build a document from already-parsed entries
    pub fn from_entries(entries: Entries) -> Self {
        Self { entries }
    }

    /// Build a document from a JSON object's members
    pub fn from_object(object: Map<String, Value>) -> Self {
        Self {
            entries: object.into_iter().collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entries(&self) -> &Entries {
        &self.entries
    }

    pub fn into_entries(self) -> Entries {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An immutable, versioned key → value table.
///
/// The store publishes a new `Snapshot` for every applied diff; readers hold
/// an `Arc<Snapshot>` and therefore always see one complete version.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Snapshot {
    version: u64,
    entries: Entries,
}

impl Snapshot {
    /// The initial, empty snapshot (version 0)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot with an explicit version
    pub fn new(version: u64, entries: Entries) -> Self {
        Self { version, entries }
    }

    /// Treat a parsed document as a standalone snapshot (version 0).
    ///
    /// Used for offline comparisons where no store is involved.
    pub fn from_document(document: Document) -> Self {
        Self {
            version: 0,
            entries: document.into_entries(),
        }
    }

    /// Number of non-empty diffs applied to reach this snapshot
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in ascending order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> &Entries {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the entries as one JSON object (bulk export)
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_snapshot_is_version_zero() {
        let snapshot = Snapshot::empty();
        assert_eq!(snapshot.version(), 0);
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.to_json(), json!({}));
    }

    #[test]
    fn test_keys_are_sorted() {
        let mut entries = Entries::new();
        entries.insert("zeta".to_string(), json!(1));
        entries.insert("alpha".to_string(), json!(2));
        let snapshot = Snapshot::new(3, entries);

        let keys: Vec<&str> = snapshot.keys().collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
        assert_eq!(snapshot.version(), 3);
    }

    #[test]
    fn test_document_from_object() {
        let object = json!({"b": [1, 2], "a": {"x": true}});
        let document = match object {
            Value::Object(map) => Document::from_object(map),
            _ => unreachable!(),
        };
        assert_eq!(document.len(), 2);
        assert_eq!(document.get("b"), Some(&json!([1, 2])));
        assert!(document.contains_key("a"));
    }
}
