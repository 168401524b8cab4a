//! Aggregator Error Types

use crate::channel::ChannelError;
use crate::core::error_handling::ContextualError;
use crate::message::CorrelationKey;
use crate::store::StoreError;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("Message {message_id} has no correlation key")]
    Correlation { message_id: Uuid },

    #[error("Timed out after {timeout_ms}ms waiting for the lock on group '{key}'")]
    LockTimeout {
        key: CorrelationKey,
        timeout_ms: u64,
    },

    #[error("Message store operation failed")]
    Store(#[from] StoreError),

    #[error("Processing of message group '{key}' failed; the group was discarded")]
    GroupProcessing {
        key: CorrelationKey,
        #[source]
        source: ProcessingError,
    },
}

/// Result type for handler operations
pub type AggregatorResult<T> = Result<T, AggregatorError>;

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("No output channel configured")]
    NoOutputChannel,

    #[error("Sending to the output channel failed")]
    Channel(#[from] ChannelError),

    #[error("Aggregation failed: {reason}")]
    Aggregation { reason: String },
}

/// Result type for group processors
pub type ProcessingResult<T> = Result<T, ProcessingError>;

impl ContextualError for AggregatorError {
    fn is_user_actionable(&self) -> bool {
        match self {
            AggregatorError::Correlation { .. } | AggregatorError::LockTimeout { .. } => true,
            AggregatorError::Store(StoreError::CapacityExceeded { .. }) => true,
            AggregatorError::Store(_) => false,
            AggregatorError::GroupProcessing { source, .. } => {
                matches!(source, ProcessingError::NoOutputChannel)
            }
        }
    }

    fn user_message(&self) -> Option<String> {
        match self {
            AggregatorError::Correlation { .. } | AggregatorError::LockTimeout { .. } => {
                Some(self.to_string())
            }
            AggregatorError::Store(error @ StoreError::CapacityExceeded { .. }) => {
                Some(format!("{} (raise [store] capacity)", error))
            }
            AggregatorError::GroupProcessing {
                key,
                source: ProcessingError::NoOutputChannel,
            } => Some(format!(
                "Group '{}' was released but no output channel is configured",
                key
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error_handling::error_chain;

    #[test]
    fn test_user_actionable_errors_have_messages() {
        let errors = vec![
            AggregatorError::Correlation {
                message_id: Uuid::nil(),
            },
            AggregatorError::LockTimeout {
                key: CorrelationKey::from("k"),
                timeout_ms: 50,
            },
            AggregatorError::Store(StoreError::CapacityExceeded { capacity: 10 }),
            AggregatorError::GroupProcessing {
                key: CorrelationKey::from("k"),
                source: ProcessingError::NoOutputChannel,
            },
        ];
        for error in errors {
            assert!(error.is_user_actionable(), "{:?}", error);
            assert!(error.user_message().is_some(), "{:?}", error);
        }
    }

    #[test]
    fn test_system_errors_are_not_user_actionable() {
        let error = AggregatorError::Store(StoreError::Synchronisation {
            message: "poisoned".to_string(),
        });
        assert!(!error.is_user_actionable());
        assert!(error.user_message().is_none());

        let error = AggregatorError::GroupProcessing {
            key: CorrelationKey::from("k"),
            source: ProcessingError::Aggregation {
                reason: "bad".to_string(),
            },
        };
        assert!(!error.is_user_actionable());
    }

    #[test]
    fn test_processing_failure_keeps_source_chain() {
        let error = AggregatorError::GroupProcessing {
            key: CorrelationKey::from("order-7"),
            source: ProcessingError::Channel(ChannelError::Rejected {
                reason: "closed".to_string(),
            }),
        };
        assert_eq!(
            error_chain(&error),
            "Processing of message group 'order-7' failed; the group was discarded: \
             Sending to the output channel failed: Message rejected: closed"
        );
    }
}
