//! Message correlation and aggregation
//!
//! Related messages are grouped by a correlation key and released as a unit
//! once a group is complete. Idle incomplete groups are expired on a
//! schedule. See [`aggregator::CorrelatingMessageHandler`] for the entry
//! point.

pub mod aggregator;
pub mod app;
pub mod channel;
pub mod core;
pub mod message;
pub mod store;
pub mod stream;
