use mosq_ledger::LedgerError;
use mosq_types::{TaskName, TypeError, Uid};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("user not found: {0}")]
    UserNotFound(Uid),

    #[error("task not found: {0}")]
    TaskNotFound(TaskName),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl EngineError {
    /// Infrastructure failures may succeed on retry; the rest will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<LedgerError> for EngineError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::UserNotFound(uid) => Self::UserNotFound(uid),
            LedgerError::TaskNotFound(name) => Self::TaskNotFound(name),
            e @ LedgerError::AmountOutOfRange(_) => Self::InvalidInput(e.to_string()),
            LedgerError::StoreUnavailable(msg) => Self::StoreUnavailable(msg),
        }
    }
}

impl From<TypeError> for EngineError {
    fn from(e: TypeError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
