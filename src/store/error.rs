//! Store Error Types

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Message store is full (capacity: {capacity} messages)")]
    CapacityExceeded { capacity: usize },

    #[error("Store synchronisation failed: {message}")]
    Synchronisation { message: String },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
