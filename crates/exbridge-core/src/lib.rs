//! exbridge Core - In-memory key snapshot bridge
//!
//! This crate provides the building blocks of the exchange bridge,
//! including:
//! - Parsing exchanged JSON blobs into top-level key documents
//! - Deterministic key diffing (Added / Changed / Removed)
//! - A copy-on-write snapshot store with lock-free reads
//! - Change notification fan-out to registered subscribers
//! - A read-only query interface
//! - The single-writer ingest pipeline and exchange file poller

pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod notifier;
pub mod pipeline;
pub mod query;
pub mod snapshot;
pub mod source;
pub mod store;

// Used by the logging macros
pub use exbridge_core_types;

// Re-export commonly used types
pub use diff::{compute_diff, KeyDiff};
pub use errors::{BridgeError, ExError, ExErrorKind, Result};
pub use notifier::{ChangeNotifier, KeySubscriber, SubscriberError, SubscriberResult, SubscriptionId};
pub use pipeline::{ContentFeed, IngestPipeline, PipelineHandle};
pub use query::QueryInterface;
pub use snapshot::{parse, Document, Snapshot};
pub use source::{ExchangePoller, PollOutcome, WatchConfig};
pub use store::{ApplyOutcome, SnapshotStore};
