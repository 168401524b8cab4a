//! Message Model
//!
//! Immutable messages exchanged between producers, the correlating handler and
//! downstream channels. A message is created once, never mutated afterwards and
//! shared read-only between threads as `Arc<Message>`.
//!
//! The headers consumed by correlation are:
//!
//! - `correlationId`: the opaque key grouping related messages
//! - `sequenceNumber`: position within the group (0 = unordered)
//! - `sequenceSize`: declared group size (0 = unknown)
//!
//! # Example
//!
//! ```rust
//! use correlate::message::{MessageBuilder, Payload};
//!
//! let message = MessageBuilder::with_payload("part one")
//!     .correlation_id("order-17")
//!     .sequence_number(1)
//!     .sequence_size(2)
//!     .build();
//!
//! assert_eq!(message.headers().sequence_size(), 2);
//! assert_eq!(message.payload(), &Payload::from("part one"));
//! ```

mod builder;
mod key;
mod message;
mod payload;

pub use builder::MessageBuilder;
pub use key::CorrelationKey;
pub use message::{Message, MessageHeaders, CORRELATION_ID, SEQUENCE_NUMBER, SEQUENCE_SIZE};
pub use payload::Payload;
