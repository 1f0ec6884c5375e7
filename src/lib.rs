//! AI tools tracker library
//!
//! Collects AI tool listings from configured sources, reconciles them into a
//! deduplicated CSV dataset, alerts on new entries and serves search.

pub mod baseline;
pub mod error;
pub mod git;
pub mod notify;
pub mod pipeline;
pub mod reconcile;
pub mod scrapers;
pub mod search;
pub mod storage;
pub mod types;
pub mod validate;

pub use types::*;
