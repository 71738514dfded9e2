//! Concurrent fetch aggregation.
//!
//! Every command that fans out to several independent requests goes
//! through the aggregator so partial failures are handled in one place.

pub mod aggregator;

pub use aggregator::*;
