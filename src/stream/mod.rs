//! Character stream output
//!
//! [`CharacterStreamWritingConsumer`] renders message payloads as text on any
//! [`std::io::Write`] sink. It is also a
//! [`MessageChannel`](crate::channel::MessageChannel), so it can serve
//! directly as a handler's output or discard channel.

mod consumer;
mod error;

pub use consumer::CharacterStreamWritingConsumer;
pub use error::{StreamError, StreamResult};
