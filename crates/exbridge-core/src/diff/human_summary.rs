//! Human-readable summary renderer for key diffs.

use crate::diff::model::KeyDiff;
use serde_json::Value;

/// Longest rendered value before it is elided
const VALUE_PREVIEW_LEN: usize = 60;

/// Render a short Markdown summary of a [`KeyDiff`].
///
/// Used by the CLI `diff` command and for debug logging. Informational only.
pub fn render_human_summary(diff: &KeyDiff) -> String {
    let mut out = String::new();

    out.push_str("## Key Diff\n\n");

    if diff.is_empty() {
        out.push_str("_No changes detected._\n");
        return out;
    }

    let counts = diff.counts();
    out.push_str(&format!(
        "**Added**: {}  \n**Changed**: {}  \n**Removed**: {}\n\n",
        counts.added, counts.changed, counts.removed
    ));

    if !diff.added.is_empty() {
        out.push_str("### Added\n\n");
        for (key, value) in &diff.added {
            out.push_str(&format!("- `{}` = `{}`\n", key, preview(value)));
        }
        out.push('\n');
    }

    if !diff.changed.is_empty() {
        out.push_str("### Changed\n\n");
        for (key, value) in &diff.changed {
            out.push_str(&format!("- `{}` → `{}`\n", key, preview(value)));
        }
        out.push('\n');
    }

    if !diff.removed.is_empty() {
        out.push_str("### Removed\n\n");
        for key in &diff.removed {
            out.push_str(&format!("- `{}`\n", key));
        }
        out.push('\n');
    }

    out
}

/// Compact single-line rendering of a value, elided on a char boundary.
fn preview(value: &Value) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() <= VALUE_PREVIEW_LEN {
        return rendered;
    }
    let mut short: String = rendered.chars().take(VALUE_PREVIEW_LEN).collect();
    short.push('…');
    short
}
