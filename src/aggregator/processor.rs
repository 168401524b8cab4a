//! Group processors
//!
//! A processor is handed each released group exactly once, together with
//! the channel its output goes to.

use crate::aggregator::{ProcessingError, ProcessingResult};
use crate::channel::MessageChannel;
use crate::message::{Message, MessageBuilder, Payload};
use crate::store::MessageGroup;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Turns a complete group into zero or more output messages
///
/// Closures with the same signature qualify.
pub trait MessageGroupProcessor: Send + Sync {
    fn process(&self, group: &MessageGroup, output: &dyn MessageChannel) -> ProcessingResult<()>;
}

impl<F> MessageGroupProcessor for F
where
    F: Fn(&MessageGroup, &dyn MessageChannel) -> ProcessingResult<()> + Send + Sync,
{
    fn process(&self, group: &MessageGroup, output: &dyn MessageChannel) -> ProcessingResult<()> {
        self(group, output)
    }
}

/// Combines a group into a single message
///
/// Members are ordered by sequence number (unnumbered messages first, ties
/// in arrival order). The output payload is a [`Payload::List`] of the member
/// payloads; it carries the group key as correlation id and every custom
/// header whose value all members agree on.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregatingMessageGroupProcessor;

impl MessageGroupProcessor for AggregatingMessageGroupProcessor {
    fn process(&self, group: &MessageGroup, output: &dyn MessageChannel) -> ProcessingResult<()> {
        if group.is_empty() {
            return Err(ProcessingError::Aggregation {
                reason: format!("group '{}' has no messages", group.key()),
            });
        }

        let mut ordered: Vec<&Arc<Message>> = group.messages().iter().collect();
        ordered.sort_by_key(|message| message.headers().sequence_number());

        let payload = Payload::List(ordered.iter().map(|m| m.payload().clone()).collect());
        let aggregate = MessageBuilder::with_payload(payload)
            .correlation_id(group.key().clone())
            .headers(shared_headers(&ordered))
            .build();

        log::debug!(
            "Aggregated {} message(s) of group '{}' into message {}",
            ordered.len(),
            group.key(),
            aggregate.id()
        );
        output.send(aggregate)?;
        Ok(())
    }
}

fn shared_headers(messages: &[&Arc<Message>]) -> BTreeMap<String, String> {
    let Some((first, rest)) = messages.split_first() else {
        return BTreeMap::new();
    };
    first
        .headers()
        .custom()
        .iter()
        .filter(|(name, value)| {
            rest.iter()
                .all(|message| message.headers().custom().get(*name) == Some(*value))
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Forwards every member unchanged, in arrival order
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughMessageGroupProcessor;

impl MessageGroupProcessor for PassThroughMessageGroupProcessor {
    fn process(&self, group: &MessageGroup, output: &dyn MessageChannel) -> ProcessingResult<()> {
        for message in group.messages() {
            output.send(Message::clone(message))?;
        }
        Ok(())
    }
}
