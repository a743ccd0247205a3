//! Snapshot parser.
//!
//! Turns a raw exchanged blob into a [`Document`]. The top level must be a
//! JSON object; its members become the snapshot keys.
//!
//! ## Errors
//!
//! - `Malformed`: not valid JSON (including empty or truncated text) or,
//!   for [`parse_bytes`], not valid UTF-8
//! - `InvalidShape`: valid JSON whose top level is an array or scalar

use crate::errors::{BridgeError, Result};
use crate::snapshot::model::Document;
use serde_json::Value;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Parse exchanged text into a document.
///
/// A leading byte-order mark is ignored. Duplicate top-level keys resolve to
/// the last occurrence.
///
/// # Errors
///
/// Returns `BridgeError::Malformed` or `BridgeError::InvalidShape`.
///
/// # Example
///
/// ```
/// use exbridge_core::snapshot::parse;
///
/// let doc = parse(r#"{"signals": [1, 2], "trains": {}}"#).unwrap();
/// assert_eq!(doc.len(), 2);
/// assert!(parse("[1, 2]").is_err());
/// ```
pub fn parse(raw: &str) -> Result<Document> {
    let text = raw.strip_prefix(BYTE_ORDER_MARK).unwrap_or(raw);
    let value: Value = serde_json::from_str(text)?;

    match value {
        Value::Object(object) => Ok(Document::from_object(object)),
        other => Err(BridgeError::InvalidShape {
            found: shape_name(&other),
        }),
    }
}

/// Parse raw file bytes into a document.
///
/// # Errors
///
/// Returns `BridgeError::Malformed` if the bytes are not UTF-8, otherwise
/// the same errors as [`parse`].
pub fn parse_bytes(bytes: &[u8]) -> Result<Document> {
    let text = std::str::from_utf8(bytes).map_err(|e| BridgeError::Malformed {
        reason: format!("content is not valid UTF-8: {}", e),
        line: 0,
        column: e.valid_up_to(),
    })?;
    parse(text)
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
