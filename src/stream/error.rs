//! Stream Error Types

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Writing to the character stream failed")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Stream synchronisation failed: {message}")]
    Synchronisation { message: String },
}

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;
