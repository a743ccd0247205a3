//! Content sources.
//!
//! A content source observes the exchange directory and hands every changed
//! blob to a [`ContentFeed`](crate::pipeline::ContentFeed). How a change is
//! detected is up to the source; the pipeline only sees text.

pub mod poller;

pub use poller::{ExchangePoller, PollOutcome, WatchConfig};
