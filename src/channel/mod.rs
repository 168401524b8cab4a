//! Message Channels
//!
//! Channels are the output sinks of the correlation engine. A released group
//! is handed to a processor together with the handler's output channel, and
//! discarded groups may be routed to a separate discard channel.
//!
//! - [`MessageChannel`]: the sink trait, implemented by closures
//! - [`QueueChannel`]: bounded in-memory FIFO for point-to-point delivery
//!
//! The character stream writer in [`crate::stream`] is also a channel, so a
//! handler can write released groups straight to stdout.

mod error;
mod queue;
mod traits;

pub use error::{ChannelError, ChannelResult};
pub use queue::{QueueChannel, DEFAULT_QUEUE_CAPACITY};
pub use traits::MessageChannel;
