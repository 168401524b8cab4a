//! Message groups

use crate::message::{CorrelationKey, Message};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Messages accumulated under one correlation key
///
/// Groups handed out by a store are snapshots: mutating the store afterwards
/// does not change a group already returned. Callers that need the current
/// state fetch it again through the key.
#[derive(Debug, Clone)]
pub struct MessageGroup {
    key: CorrelationKey,
    messages: Vec<Arc<Message>>,
    last_modified: Instant,
}

impl MessageGroup {
    /// An empty group, also used as the placeholder for unknown keys
    pub fn new(key: CorrelationKey) -> Self {
        Self {
            key,
            messages: Vec::new(),
            last_modified: Instant::now(),
        }
    }

    pub fn key(&self) -> &CorrelationKey {
        &self.key
    }

    /// Messages in arrival order
    pub fn messages(&self) -> &[Arc<Message>] {
        &self.messages
    }

    pub fn size(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// When the last message was added (or the group was created)
    pub fn last_modified(&self) -> Instant {
        self.last_modified
    }

    pub fn idle_for(&self) -> Duration {
        self.last_modified.elapsed()
    }

    /// True once the group has seen no additions for at least `timeout`
    pub fn is_idle_for(&self, timeout: Duration) -> bool {
        self.idle_for() >= timeout
    }

    /// Expected size, taken from the first message declaring one
    pub fn sequence_size(&self) -> Option<u32> {
        self.messages
            .iter()
            .map(|message| message.headers().sequence_size())
            .find(|size| *size > 0)
    }

    pub(crate) fn add(&mut self, message: Arc<Message>) {
        self.messages.push(message);
        self.last_modified = Instant::now();
    }
}
