//! Test modules for the correlating handler
//!
//! Tests are organized by functional area: the message path, expiry
//! participation, and behaviour under concurrent use.

mod concurrent;

use crate::aggregator::{MessageGroupProcessor, ProcessingResult};
use crate::channel::MessageChannel;
use crate::message::{Message, MessageBuilder};
use crate::store::MessageGroup;
use std::sync::{Arc, Mutex};

/// Processor that records every group it sees and forwards the members
#[derive(Default)]
pub(super) struct RecordingProcessor {
    groups: Mutex<Vec<MessageGroup>>,
}

impl RecordingProcessor {
    pub(super) fn calls(&self) -> usize {
        self.groups.lock().unwrap().len()
    }

    pub(super) fn groups(&self) -> Vec<MessageGroup> {
        self.groups.lock().unwrap().clone()
    }
}

impl MessageGroupProcessor for RecordingProcessor {
    fn process(&self, group: &MessageGroup, output: &dyn MessageChannel) -> ProcessingResult<()> {
        self.groups.lock().unwrap().push(group.clone());
        for message in group.messages() {
            output.send(Message::clone(message))?;
        }
        Ok(())
    }
}

/// Processor handle for the builder that keeps `recorder` inspectable
pub(super) fn shared(recorder: &Arc<RecordingProcessor>) -> impl MessageGroupProcessor + 'static {
    let recorder = Arc::clone(recorder);
    move |group: &MessageGroup, output: &dyn MessageChannel| recorder.process(group, output)
}

/// Message `number` of `size` in group `key`
pub(super) fn part(key: &str, number: u32, size: u32) -> Message {
    MessageBuilder::with_payload(format!("{}-{}", key, number))
        .correlation_id(key)
        .sequence_number(number)
        .sequence_size(size)
        .build()
}
