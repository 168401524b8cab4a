//! Bounded in-memory point-to-point channel
//!
//! Messages are buffered in arrival order until a receiver takes them. Each
//! message is received exactly once; unlike a broadcast channel there is no
//! per-receiver position.

use crate::channel::{ChannelError, ChannelResult, MessageChannel};
use crate::core::sync::{read_lock, write_lock};
use crate::message::Message;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Default capacity used by [`QueueChannel::new`]
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Bounded FIFO channel
///
/// `send` fails with [`ChannelError::Full`] once `capacity` messages are
/// waiting, so a stalled receiver applies backpressure to the sender instead
/// of growing memory without limit.
#[derive(Debug)]
pub struct QueueChannel {
    name: String,
    capacity: usize,
    messages: RwLock<VecDeque<Message>>,
    sent: AtomicU64,
}

impl QueueChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_capacity(name, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            messages: RwLock::new(VecDeque::new()),
            sent: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of messages waiting to be received
    pub fn size(&self) -> ChannelResult<usize> {
        Ok(read_lock(&self.messages, &self.name, sync_error)?.len())
    }

    /// Total number of messages ever accepted
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Acquire)
    }

    /// Take the oldest waiting message
    pub fn receive(&self) -> ChannelResult<Option<Message>> {
        Ok(write_lock(&self.messages, &self.name, sync_error)?.pop_front())
    }

    /// Take up to `max` waiting messages in arrival order
    pub fn receive_batch(&self, max: usize) -> ChannelResult<Vec<Message>> {
        let mut messages = write_lock(&self.messages, &self.name, sync_error)?;
        let count = max.min(messages.len());
        Ok(messages.drain(..count).collect())
    }

    /// Remove and return every waiting message
    pub fn clear(&self) -> ChannelResult<Vec<Message>> {
        let mut messages = write_lock(&self.messages, &self.name, sync_error)?;
        Ok(messages.drain(..).collect())
    }
}

impl MessageChannel for QueueChannel {
    fn send(&self, message: Message) -> ChannelResult<()> {
        let mut messages = write_lock(&self.messages, &self.name, sync_error)?;
        if messages.len() >= self.capacity {
            return Err(ChannelError::Full {
                channel: self.name.clone(),
                capacity: self.capacity,
            });
        }
        messages.push_back(message);
        self.sent.fetch_add(1, Ordering::AcqRel);
        log::trace!("Channel '{}' accepted message ({} waiting)", self.name, messages.len());
        Ok(())
    }
}

fn sync_error(message: String) -> ChannelError {
    ChannelError::Synchronisation { message }
}
