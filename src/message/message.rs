//! Message and header types

use crate::message::{CorrelationKey, Payload};
use std::collections::BTreeMap;
use std::time::SystemTime;
use uuid::Uuid;

/// Header name carrying the correlation key
pub const CORRELATION_ID: &str = "correlationId";
/// Header name carrying the position of a message within its group
pub const SEQUENCE_NUMBER: &str = "sequenceNumber";
/// Header name carrying the declared size of a group
pub const SEQUENCE_SIZE: &str = "sequenceSize";

/// Header information attached to every message
///
/// The id and timestamp are assigned when the message is built; the
/// correlation headers are supplied by the producer.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageHeaders {
    pub(crate) id: Uuid,
    pub(crate) timestamp: SystemTime,
    pub(crate) correlation_id: Option<CorrelationKey>,
    pub(crate) sequence_number: u32,
    pub(crate) sequence_size: u32,
    pub(crate) custom: BTreeMap<String, String>,
}

impl MessageHeaders {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    pub fn correlation_id(&self) -> Option<&CorrelationKey> {
        self.correlation_id.as_ref()
    }

    /// Position within the group, 0 when the message is unordered
    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    /// Declared group size, 0 when unknown
    pub fn sequence_size(&self) -> u32 {
        self.sequence_size
    }

    /// Application-defined headers
    pub fn custom(&self) -> &BTreeMap<String, String> {
        &self.custom
    }

    /// Look up any header by name, including the well-known ones
    ///
    /// Unset sequence headers (0) and a missing correlation id read as absent.
    pub fn get(&self, name: &str) -> Option<String> {
        match name {
            CORRELATION_ID => self.correlation_id.as_ref().map(|key| key.to_string()),
            SEQUENCE_NUMBER if self.sequence_number > 0 => Some(self.sequence_number.to_string()),
            SEQUENCE_SIZE if self.sequence_size > 0 => Some(self.sequence_size.to_string()),
            SEQUENCE_NUMBER | SEQUENCE_SIZE => None,
            other => self.custom.get(other).cloned(),
        }
    }
}

/// Immutable message envelope
///
/// Build messages with [`MessageBuilder`](crate::message::MessageBuilder).
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub(crate) headers: MessageHeaders,
    pub(crate) payload: Payload,
}

impl Message {
    pub fn headers(&self) -> &MessageHeaders {
        &self.headers
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn id(&self) -> Uuid {
        self.headers.id
    }
}
