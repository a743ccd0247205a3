//! Key diff computation engine.
//!
//! The core entry point is [`compute_diff`], which classifies the top-level
//! keys of a freshly parsed [`Document`] against the live [`Snapshot`].

use crate::diff::model::KeyDiff;
use crate::snapshot::model::{Document, Entries, Snapshot};
use serde_json::{Number, Value};

/// Compute the key diff between the live snapshot and a new document.
///
/// - key only in `next` → Added
/// - key in both, values structurally unequal → Changed
/// - key in both, values equal → not reported
/// - key only in `previous` → Removed
///
/// The comparison is shallow: a nested mutation surfaces as the enclosing
/// top-level value being Changed.
///
/// # Example
///
/// ```
/// use exbridge_core::diff::compute_diff;
/// use exbridge_core::snapshot::{parse, Snapshot};
///
/// let previous = Snapshot::from_document(parse(r#"{"a":1,"b":2}"#).unwrap());
/// let next = parse(r#"{"a":1,"c":3}"#).unwrap();
///
/// let diff = compute_diff(&previous, &next);
/// assert!(diff.added.contains_key("c"));
/// assert!(diff.removed.contains("b"));
/// assert!(diff.changed.is_empty());
/// ```
pub fn compute_diff(previous: &Snapshot, next: &Document) -> KeyDiff {
    diff_entries(previous.entries(), next.entries())
}

/// Compute the key diff between two plain entry maps.
pub fn diff_entries(previous: &Entries, next: &Entries) -> KeyDiff {
    let mut diff = KeyDiff::default();

    for (key, value) in next {
        match previous.get(key) {
            None => {
                diff.added.insert(key.clone(), value.clone());
            }
            Some(old) if !values_equal(old, value) => {
                diff.changed.insert(key.clone(), value.clone());
            }
            Some(_) => {}
        }
    }

    diff.removed.extend(
        previous
            .keys()
            .filter(|key| !next.contains_key(*key))
            .cloned(),
    );

    diff
}

/// Deep structural equality of two JSON values.
///
/// Object member order is irrelevant and numbers compare by numeric value,
/// so `{"a":1,"b":2.0}` equals `{"b":2,"a":1}`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Integers compare exactly. An integer equals a float only when the float
/// is integral and denotes exactly the same value, so precision lost in the
/// f64 conversion is never hidden.
fn numbers_equal(x: &Number, y: &Number) -> bool {
    match (as_integer(x), as_integer(y)) {
        (Some(a), Some(b)) => a == b,
        (Some(i), None) => y.as_f64().is_some_and(|f| float_is_integer(f, i)),
        (None, Some(i)) => x.as_f64().is_some_and(|f| float_is_integer(f, i)),
        (None, None) => match (x.as_f64(), y.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn float_is_integer(f: f64, i: i128) -> bool {
    // 2^127; i128 covers every integer serde_json can hold
    const BOUND: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;
    f.is_finite() && f.fract() == 0.0 && (-BOUND..BOUND).contains(&f) && f as i128 == i
}
