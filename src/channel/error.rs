//! Channel Error Types

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel '{channel}' is full (capacity: {capacity})")]
    Full { channel: String, capacity: usize },

    #[error("Message rejected: {reason}")]
    Rejected { reason: String },

    #[error("Delivery to channel '{channel}' failed")]
    Delivery {
        channel: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Channel synchronisation failed: {message}")]
    Synchronisation { message: String },
}

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;
