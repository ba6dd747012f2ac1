/// Errors from record store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A write was rejected by a unique-key constraint.
    #[error("duplicate key in {collection}: {key}")]
    DuplicateKey {
        collection: &'static str,
        key: String,
    },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An increment would take a stored counter outside the `i64` range.
    /// Nothing was written.
    #[error("numeric overflow: {0}")]
    Overflow(String),

    /// The backend could not be reached or failed mid-operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns `true` for unique-key conflicts.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Returns `true` when an increment was rejected for overflow.
    pub fn is_overflow(&self) -> bool {
        matches!(self, Self::Overflow(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
