//! The output sink abstraction

use crate::channel::ChannelResult;
use crate::message::Message;

/// Destination for outbound messages
///
/// Released groups are handed to a processor together with a channel; the
/// processor sends zero or more messages to it. Closures taking a
/// [`Message`] qualify:
///
/// ```rust
/// use correlate::channel::{ChannelResult, MessageChannel};
/// use correlate::message::{Message, MessageBuilder};
///
/// let printer = |message: Message| -> ChannelResult<()> {
///     println!("{}", message.payload());
///     Ok(())
/// };
/// printer.send(MessageBuilder::with_payload("done").build()).unwrap();
/// ```
pub trait MessageChannel: Send + Sync {
    fn send(&self, message: Message) -> ChannelResult<()>;
}

impl<F> MessageChannel for F
where
    F: Fn(Message) -> ChannelResult<()> + Send + Sync,
{
    fn send(&self, message: Message) -> ChannelResult<()> {
        self(message)
    }
}
