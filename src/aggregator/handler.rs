//! The correlating message handler

use crate::aggregator::{
    AggregatorError, AggregatorResult, CorrelationStrategy, ExpiryAction, HandlerSettings,
    HeaderCorrelationStrategy, MessageGroupProcessor, ProcessingError, ProcessingResult,
    ReleaseStrategy, SequenceSizeReleaseStrategy,
};
use crate::channel::MessageChannel;
use crate::core::error_handling::error_chain;
use crate::message::{CorrelationKey, Message};
use crate::store::{
    ExpiryOutcome, LockOwner, MessageGroup, MessageGroupCallback, MessageGroupStore,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Result of handing one message to the handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// The message joined a group that is not complete yet
    Pending {
        key: CorrelationKey,
        group_size: usize,
    },
    /// The message completed its group, which was processed and removed
    Released {
        key: CorrelationKey,
        group_size: usize,
    },
}

impl HandleOutcome {
    pub fn key(&self) -> &CorrelationKey {
        match self {
            HandleOutcome::Pending { key, .. } | HandleOutcome::Released { key, .. } => key,
        }
    }

    pub fn group_size(&self) -> usize {
        match self {
            HandleOutcome::Pending { group_size, .. }
            | HandleOutcome::Released { group_size, .. } => *group_size,
        }
    }

    pub fn is_released(&self) -> bool {
        matches!(self, HandleOutcome::Released { .. })
    }
}

/// Groups related messages and releases each group once it is complete
///
/// Messages are correlated into groups held by a [`MessageGroupStore`]. After
/// every addition the release strategy inspects the group; a complete group
/// is handed to the processor once, then removed. Work on one key is
/// serialized by a per-key lock, so unrelated keys never wait for each other
/// and a group is never completed and expired at the same time.
///
/// The key locks belong to the store, so several handlers may share one
/// store. Each handler expires only the groups it started; once a handler
/// is dropped its groups are left to whoever expires next.
///
/// The handler registers itself with the store for expiry. Only a weak
/// reference is registered; dropping the last handle detaches it.
///
/// # Example
///
/// ```rust
/// use correlate::aggregator::{AggregatingMessageGroupProcessor, CorrelatingMessageHandler};
/// use correlate::channel::QueueChannel;
/// use correlate::message::MessageBuilder;
/// use correlate::store::SimpleMessageStore;
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let output = Arc::new(QueueChannel::new("aggregated"));
/// let handler = CorrelatingMessageHandler::builder(
///     AggregatingMessageGroupProcessor,
///     Arc::new(SimpleMessageStore::new()),
/// )
/// .output_channel(output.clone())
/// .build()?;
///
/// for n in 1..=2 {
///     let message = MessageBuilder::with_payload(format!("part {}", n))
///         .correlation_id("order-1")
///         .sequence_number(n)
///         .sequence_size(2)
///         .build();
///     handler.handle_message(message)?;
/// }
///
/// let aggregate = output.receive()?.expect("group released");
/// assert_eq!(aggregate.payload().to_string(), "[part 1, part 2]");
/// assert_eq!(handler.lock_count(), 0);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CorrelatingMessageHandler {
    core: Arc<HandlerCore>,
}

impl CorrelatingMessageHandler {
    pub fn builder(
        processor: impl MessageGroupProcessor + 'static,
        store: Arc<dyn MessageGroupStore>,
    ) -> CorrelatingMessageHandlerBuilder {
        CorrelatingMessageHandlerBuilder {
            processor: Box::new(processor),
            store,
            correlation_strategy: Box::new(HeaderCorrelationStrategy::default()),
            release_strategy: Box::new(SequenceSizeReleaseStrategy),
            output_channel: None,
            discard_channel: None,
            lock_timeout: None,
            expiry_action: ExpiryAction::default(),
        }
    }

    /// Add `message` to its group, releasing the group if it is now complete
    ///
    /// A message without a correlation key is rejected before the store is
    /// touched. When processing a released group fails the group is still
    /// removed and the failure is returned.
    pub fn handle_message(&self, message: Message) -> AggregatorResult<HandleOutcome> {
        self.core.handle(message)
    }

    /// Number of keys with a group accumulating or completing in the store
    pub fn lock_count(&self) -> usize {
        self.core.store.key_locks().len()
    }

    pub fn store(&self) -> &Arc<dyn MessageGroupStore> {
        &self.core.store
    }

    pub fn expiry_action(&self) -> ExpiryAction {
        self.core.expiry_action
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.core.lock_timeout
    }
}

/// Builder for [`CorrelatingMessageHandler`]
pub struct CorrelatingMessageHandlerBuilder {
    processor: Box<dyn MessageGroupProcessor>,
    store: Arc<dyn MessageGroupStore>,
    correlation_strategy: Box<dyn CorrelationStrategy>,
    release_strategy: Box<dyn ReleaseStrategy>,
    output_channel: Option<Arc<dyn MessageChannel>>,
    discard_channel: Option<Arc<dyn MessageChannel>>,
    lock_timeout: Option<Duration>,
    expiry_action: ExpiryAction,
}

impl CorrelatingMessageHandlerBuilder {
    pub fn correlation_strategy(mut self, strategy: impl CorrelationStrategy + 'static) -> Self {
        self.correlation_strategy = Box::new(strategy);
        self
    }

    pub fn release_strategy(mut self, strategy: impl ReleaseStrategy + 'static) -> Self {
        self.release_strategy = Box::new(strategy);
        self
    }

    /// Where released groups are sent
    pub fn output_channel(mut self, channel: Arc<dyn MessageChannel>) -> Self {
        self.output_channel = Some(channel);
        self
    }

    /// Where messages of discarded expired groups are sent
    pub fn discard_channel(mut self, channel: Arc<dyn MessageChannel>) -> Self {
        self.discard_channel = Some(channel);
        self
    }

    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    pub fn expiry_action(mut self, action: ExpiryAction) -> Self {
        self.expiry_action = action;
        self
    }

    /// Apply file or command-line settings
    pub fn settings(mut self, settings: &HandlerSettings) -> Self {
        self.lock_timeout = settings.lock_timeout();
        self.expiry_action = settings.expiry_action;
        self
    }

    /// Create the handler and register it with the store for expiry
    pub fn build(self) -> AggregatorResult<CorrelatingMessageHandler> {
        let core = Arc::new(HandlerCore {
            id: NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed),
            processor: self.processor,
            store: self.store,
            correlation_strategy: self.correlation_strategy,
            release_strategy: self.release_strategy,
            output_channel: self.output_channel,
            discard_channel: self.discard_channel,
            lock_timeout: self.lock_timeout,
            expiry_action: self.expiry_action,
        });

        let callback = Arc::new(HandlerExpiryCallback {
            core: Arc::downgrade(&core),
        });
        core.store.register_expiry_callback(callback)?;
        log::debug!(
            "Correlating handler ready (expiry action: {}, lock timeout: {:?})",
            core.expiry_action,
            core.lock_timeout
        );
        Ok(CorrelatingMessageHandler { core })
    }
}

struct HandlerCore {
    id: LockOwner,
    processor: Box<dyn MessageGroupProcessor>,
    store: Arc<dyn MessageGroupStore>,
    correlation_strategy: Box<dyn CorrelationStrategy>,
    release_strategy: Box<dyn ReleaseStrategy>,
    output_channel: Option<Arc<dyn MessageChannel>>,
    discard_channel: Option<Arc<dyn MessageChannel>>,
    lock_timeout: Option<Duration>,
    expiry_action: ExpiryAction,
}

impl HandlerCore {
    fn handle(&self, message: Message) -> AggregatorResult<HandleOutcome> {
        let key = self
            .correlation_strategy
            .correlation_key(&message)
            .ok_or(AggregatorError::Correlation {
                message_id: message.id(),
            })?;

        let mut guard = self
            .store
            .key_locks()
            .acquire(&key, Some(self.id), self.lock_timeout)
            .ok_or_else(|| AggregatorError::LockTimeout {
                key: key.clone(),
                timeout_ms: self.lock_timeout.map_or(0, |t| t.as_millis() as u64),
            })?;

        let group = match self.store.add_message_to_group(&key, Arc::new(message)) {
            Ok(group) => group,
            Err(e) => {
                // No group to guard; don't leave an entry behind
                let empty = self
                    .store
                    .get_message_group(&key)
                    .map_or(true, |group| group.is_empty());
                if empty {
                    guard.retire();
                }
                return Err(e.into());
            }
        };
        let group_size = group.size();

        if !self.release_strategy.can_release(&group) {
            log::trace!("Group '{}' pending with {} message(s)", key, group_size);
            return Ok(HandleOutcome::Pending { key, group_size });
        }

        let processed = self.process(&group, self.output_channel.as_deref());
        let removed = self.store.remove_message_group(&key);
        guard.retire();
        drop(guard);
        removed?;

        match processed {
            Ok(()) => {
                log::debug!("Released group '{}' with {} message(s)", key, group_size);
                Ok(HandleOutcome::Released { key, group_size })
            }
            Err(source) => {
                log::debug!("Discarded group '{}' after processing failure", key);
                Err(AggregatorError::GroupProcessing { key, source })
            }
        }
    }

    fn process(
        &self,
        group: &MessageGroup,
        output: Option<&dyn MessageChannel>,
    ) -> ProcessingResult<()> {
        let output = output.ok_or(ProcessingError::NoOutputChannel)?;
        self.processor.process(group, output)
    }

    fn expire(&self, stale: MessageGroup) -> ExpiryOutcome {
        let key = stale.key();
        let Some(mut guard) = self.store.key_locks().try_acquire_owned(key, self.id) else {
            log::trace!("Group '{}' is busy or not ours; not expiring", key);
            return ExpiryOutcome::Skipped;
        };

        let group = match self.store.get_message_group(key) {
            Ok(group) => group,
            Err(e) => {
                log::warn!("Could not re-read expiring group '{}': {}", key, e);
                return ExpiryOutcome::Skipped;
            }
        };
        if group.is_empty() {
            // Completed by someone else since it was selected
            guard.retire();
            return ExpiryOutcome::Skipped;
        }
        if group.last_modified() != stale.last_modified() {
            log::trace!("Group '{}' changed since selection; not expiring", key);
            return ExpiryOutcome::Skipped;
        }

        match self.expiry_action {
            ExpiryAction::Discard => self.discard(&group),
            ExpiryAction::ForceComplete => {
                match self.process(&group, self.output_channel.as_deref()) {
                    Ok(()) => log::debug!(
                        "Force-completed expired group '{}' with {} message(s)",
                        key,
                        group.size()
                    ),
                    Err(e) => log::error!(
                        "Forced completion of group '{}' failed: {}",
                        key,
                        error_chain(&e)
                    ),
                }
            }
        }

        if let Err(e) = self.store.remove_message_group(key) {
            log::error!("Could not remove expired group '{}': {}", key, e);
        }
        guard.retire();
        ExpiryOutcome::Expired
    }

    fn discard(&self, group: &MessageGroup) {
        match &self.discard_channel {
            Some(channel) => {
                for message in group.messages() {
                    if let Err(e) = channel.send(Message::clone(message)) {
                        log::warn!(
                            "Failed to discard message {} of group '{}': {}",
                            message.id(),
                            group.key(),
                            error_chain(&e)
                        );
                    }
                }
                log::debug!(
                    "Sent {} message(s) of expired group '{}' to the discard channel",
                    group.size(),
                    group.key()
                );
            }
            None => log::info!(
                "Dropping {} message(s) of expired group '{}'",
                group.size(),
                group.key()
            ),
        }
    }
}

impl Drop for HandlerCore {
    fn drop(&mut self) {
        self.store.key_locks().disown(self.id);
    }
}

/// Store-side hook through which a handler takes part in expiry
struct HandlerExpiryCallback {
    core: Weak<HandlerCore>,
}

impl MessageGroupCallback for HandlerExpiryCallback {
    fn on_expiry(&self, group: MessageGroup) -> ExpiryOutcome {
        match self.core.upgrade() {
            Some(core) => core.expire(group),
            None => ExpiryOutcome::Detached,
        }
    }
}
