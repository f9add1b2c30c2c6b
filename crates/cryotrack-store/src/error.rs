//! Error types for local persistence

/// Failures while reading or writing local state
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying file I/O failed
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be decoded
    #[error("corrupt record at key {key}: {source}")]
    Corrupt {
        /// Store key whose value failed to decode
        key: String,
        /// Decode failure
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be encoded for storage
    #[error("failed to encode value for key {key}: {source}")]
    Encode {
        /// Store key whose value failed to encode
        key: String,
        /// Encode failure
        #[source]
        source: serde_json::Error,
    },

    /// Referenced container does not exist
    #[error("unknown container: {0}")]
    UnknownContainer(String),
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
