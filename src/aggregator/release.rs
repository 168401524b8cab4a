//! Release strategies

use crate::store::MessageGroup;

/// Decides whether a group is complete
///
/// Consulted after every addition, with the key lock held.
pub trait ReleaseStrategy: Send + Sync {
    fn can_release(&self, group: &MessageGroup) -> bool;
}

impl<F> ReleaseStrategy for F
where
    F: Fn(&MessageGroup) -> bool + Send + Sync,
{
    fn can_release(&self, group: &MessageGroup) -> bool {
        self(group)
    }
}

/// Releases once the group holds as many messages as one of them declares
///
/// A group where no message declares a size is never released; only
/// expiry removes it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceSizeReleaseStrategy;

impl ReleaseStrategy for SequenceSizeReleaseStrategy {
    fn can_release(&self, group: &MessageGroup) -> bool {
        group
            .messages()
            .iter()
            .map(|message| message.headers().sequence_size() as usize)
            .any(|size| size > 0 && group.size() >= size)
    }
}

/// Releases once the group holds `threshold` messages
#[derive(Debug, Clone, Copy)]
pub struct MessageCountReleaseStrategy {
    threshold: usize,
}

impl MessageCountReleaseStrategy {
    /// A threshold of zero behaves like one
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl ReleaseStrategy for MessageCountReleaseStrategy {
    fn can_release(&self, group: &MessageGroup) -> bool {
        group.size() >= self.threshold
    }
}
