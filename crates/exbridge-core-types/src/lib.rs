//! Core types shared across exbridge facilities
//!
//! This crate provides foundational types used by the error handling,
//! logging and HTTP facilities:
//!
//! - **Correlation types**: RequestId for per-request log correlation
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::RequestId;
