//! Test modules for the message group store
//!
//! Grouped by functional area: basic store operations, expiry with and
//! without callbacks, and the background reaper.
