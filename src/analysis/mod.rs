//! Joining and aggregation.

pub mod aggregator;
pub mod joiner;

pub use aggregator::*;
pub use joiner::join;
