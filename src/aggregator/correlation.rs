//! Correlation strategies

use crate::message::{CorrelationKey, Message, CORRELATION_ID};

/// Derives the group a message belongs to
///
/// Returning `None` rejects the message. Closures qualify:
///
/// ```rust
/// use correlate::aggregator::CorrelationStrategy;
/// use correlate::message::{CorrelationKey, Message, MessageBuilder};
///
/// let by_tenant = |message: &Message| message.headers().get("tenant").map(CorrelationKey::from);
/// let message = MessageBuilder::with_payload("x").header("tenant", "acme").build();
/// assert_eq!(by_tenant.correlation_key(&message), Some(CorrelationKey::from("acme")));
/// ```
pub trait CorrelationStrategy: Send + Sync {
    fn correlation_key(&self, message: &Message) -> Option<CorrelationKey>;
}

impl<F> CorrelationStrategy for F
where
    F: Fn(&Message) -> Option<CorrelationKey> + Send + Sync,
{
    fn correlation_key(&self, message: &Message) -> Option<CorrelationKey> {
        self(message)
    }
}

/// Correlates on the value of one header
///
/// Defaults to the `correlationId` header. An empty value counts as missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCorrelationStrategy {
    header: String,
}

impl HeaderCorrelationStrategy {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }
}

impl Default for HeaderCorrelationStrategy {
    fn default() -> Self {
        Self::new(CORRELATION_ID)
    }
}

impl CorrelationStrategy for HeaderCorrelationStrategy {
    fn correlation_key(&self, message: &Message) -> Option<CorrelationKey> {
        message
            .headers()
            .get(&self.header)
            .filter(|value| !value.is_empty())
            .map(CorrelationKey::from)
    }
}
