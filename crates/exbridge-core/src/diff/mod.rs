//! Key diff engine.
//!
//! Compares the live snapshot against a newly parsed document and classifies
//! every top-level key as Added, Changed or Removed.
//!
//! ## Entry point
//!
//! ```ignore
//! use exbridge_core::diff::engine::compute_diff;
//!
//! let diff = compute_diff(&snapshot, &document);
//! let summary = exbridge_core::diff::human_summary::render_human_summary(&diff);
//! ```
//!
//! ## Guarantees
//!
//! - **Determinism**: identical inputs produce identical diffs; keys ascend
//!   within each category.
//! - **Structural equality**: re-serialization (whitespace, member order,
//!   `1` vs `1.0`) never reports a change.
//! - **Shallow**: only top-level keys are classified.

pub mod engine;
pub mod human_summary;
pub mod model;

pub use engine::{compute_diff, diff_entries, values_equal};
pub use human_summary::render_human_summary;
pub use model::{ChangeKind, DiffCounts, KeyChange, KeyDiff};
