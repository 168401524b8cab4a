//! Builder for immutable messages

use crate::message::{
    CorrelationKey, Message, MessageHeaders, Payload, CORRELATION_ID, SEQUENCE_NUMBER,
    SEQUENCE_SIZE,
};
use std::collections::BTreeMap;
use std::time::SystemTime;
use uuid::Uuid;

/// Builder for [`Message`]
///
/// Every built message receives a fresh id and timestamp, including messages
/// copied from an existing one with [`MessageBuilder::from_message`].
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    payload: Payload,
    correlation_id: Option<CorrelationKey>,
    sequence_number: u32,
    sequence_size: u32,
    custom: BTreeMap<String, String>,
}

impl MessageBuilder {
    pub fn with_payload(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
            correlation_id: None,
            sequence_number: 0,
            sequence_size: 0,
            custom: BTreeMap::new(),
        }
    }

    /// Start from the headers and payload of an existing message
    pub fn from_message(message: &Message) -> Self {
        let headers = message.headers();
        Self {
            payload: message.payload().clone(),
            correlation_id: headers.correlation_id.clone(),
            sequence_number: headers.sequence_number,
            sequence_size: headers.sequence_size,
            custom: headers.custom.clone(),
        }
    }

    pub fn payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn correlation_id(mut self, key: impl Into<CorrelationKey>) -> Self {
        self.correlation_id = Some(key.into());
        self
    }

    pub fn clear_correlation_id(mut self) -> Self {
        self.correlation_id = None;
        self
    }

    pub fn sequence_number(mut self, sequence_number: u32) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    pub fn sequence_size(mut self, sequence_size: u32) -> Self {
        self.sequence_size = sequence_size;
        self
    }

    /// Set one header by name
    ///
    /// The well-known names `correlationId`, `sequenceNumber` and
    /// `sequenceSize` set the typed fields. An empty correlation id clears
    /// it; a sequence value that is not a number is ignored with a warning.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match name.as_str() {
            CORRELATION_ID => {
                self.correlation_id = Some(value)
                    .filter(|value| !value.is_empty())
                    .map(CorrelationKey::from);
            }
            SEQUENCE_NUMBER => {
                if let Some(number) = parse_sequence(&name, &value) {
                    self.sequence_number = number;
                }
            }
            SEQUENCE_SIZE => {
                if let Some(size) = parse_sequence(&name, &value) {
                    self.sequence_size = size;
                }
            }
            _ => {
                self.custom.insert(name, value);
            }
        }
        self
    }

    pub fn headers(self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        headers
            .into_iter()
            .fold(self, |builder, (name, value)| builder.header(name, value))
    }

    pub fn build(self) -> Message {
        Message {
            headers: MessageHeaders {
                id: Uuid::new_v4(),
                timestamp: SystemTime::now(),
                correlation_id: self.correlation_id,
                sequence_number: self.sequence_number,
                sequence_size: self.sequence_size,
                custom: self.custom,
            },
            payload: self.payload,
        }
    }
}

fn parse_sequence(name: &str, value: &str) -> Option<u32> {
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            log::warn!("Ignoring header {}: '{}' is not a sequence value", name, value);
            None
        }
    }
}
