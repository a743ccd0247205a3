//! Snapshot model and parsing.
//!
//! ## Responsibilities
//!
//! - Turn raw exchanged text into a [`Document`] (top-level JSON object)
//! - Define the immutable [`Snapshot`] that the store publishes
//! - Compute content digests used to detect unchanged blobs
//!
//! ## Non-Responsibilities
//!
//! - Diffing (handled by [`crate::diff`])
//! - Publication and concurrency (handled by [`crate::store`])

pub mod digest;
pub mod model;
pub mod parser;

pub use digest::content_digest;
pub use model::{Document, Entries, Snapshot};
pub use parser::{parse, parse_bytes};
