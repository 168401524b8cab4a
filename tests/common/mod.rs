//! Shared helpers for integration tests

use correlate::channel::{ChannelResult, MessageChannel};
use correlate::message::{Message, MessageBuilder};
use std::sync::{Arc, Mutex};

/// Message `number` of `size` in group `key`, payload `"<key>-<number>"`
pub fn part(key: &str, number: u32, size: u32) -> Message {
    MessageBuilder::with_payload(format!("{}-{}", key, number))
        .correlation_id(key)
        .sequence_number(number)
        .sequence_size(size)
        .build()
}

/// In-memory sink that a test can clone and inspect
#[derive(Clone, Default)]
pub struct SharedSink {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedSink {
    pub fn contents(&self) -> String {
        String::from_utf8(self.bytes.lock().unwrap().clone()).unwrap()
    }
}

impl std::io::Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Channel collecting every message it receives
#[derive(Default)]
pub struct CollectingChannel {
    messages: Mutex<Vec<Message>>,
}

impl CollectingChannel {
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }
}

impl MessageChannel for CollectingChannel {
    fn send(&self, message: Message) -> ChannelResult<()> {
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}
