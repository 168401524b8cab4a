//! Message Correlation and Aggregation
//!
//! The [`CorrelatingMessageHandler`] groups related messages and releases
//! each group once it is complete. Three pluggable policies decide its
//! behaviour:
//!
//! - a [`CorrelationStrategy`] maps each message to a correlation key;
//! - a [`ReleaseStrategy`] decides whether the group for that key is complete;
//! - a [`MessageGroupProcessor`] turns a complete group into output messages.
//!
//! # Architecture
//!
//! ```text
//!   handle_message(msg)
//!          │
//!          ▼
//!   CorrelationStrategy ──► key ──► KeyLockTable (one lock per live key)
//!                                        │ held
//!                                        ▼
//!                           MessageGroupStore::add_message_to_group
//!                                        │
//!                                        ▼
//!                           ReleaseStrategy::can_release?
//!                             │ no                 │ yes
//!                             ▼                    ▼
//!                          Pending       MessageGroupProcessor ──► output channel
//!                                                  │
//!                                                  ▼
//!                                     remove group, retire key lock
//! ```
//!
//! The lock table belongs to the store. Expiry also runs through the store:
//! the handler registers a callback that only expires groups it started and
//! whose key lock it can take without waiting, so a group is never completed
//! twice.

mod correlation;
mod error;
mod handler;
mod processor;
mod release;
mod settings;

pub use correlation::{CorrelationStrategy, HeaderCorrelationStrategy};
pub use error::{AggregatorError, AggregatorResult, ProcessingError, ProcessingResult};
pub use handler::{CorrelatingMessageHandler, CorrelatingMessageHandlerBuilder, HandleOutcome};
pub use processor::{
    AggregatingMessageGroupProcessor, MessageGroupProcessor, PassThroughMessageGroupProcessor,
};
pub use release::{MessageCountReleaseStrategy, ReleaseStrategy, SequenceSizeReleaseStrategy};
pub use settings::{ExpiryAction, HandlerSettings};

#[cfg(test)]
mod tests;
