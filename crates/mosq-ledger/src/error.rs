use mosq_store::StoreError;
use mosq_types::{TaskName, Uid};

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("user not found: {0}")]
    UserNotFound(Uid),

    #[error("task not found: {0}")]
    TaskNotFound(TaskName),

    /// An amount would push a balance or counter out of range. Nothing
    /// was written.
    #[error("amount out of range: {0}")]
    AmountOutOfRange(String),

    /// The record store failed; the caller may retry.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UserNotFound(_) | Self::TaskNotFound(_))
    }
}

// Unique-key conflicts are resolved at the call sites that expect them.
impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Overflow(msg) => Self::AmountOutOfRange(msg),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
