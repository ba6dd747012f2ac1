use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("empty {kind}")]
    Empty { kind: &'static str },

    #[error("{kind} contains whitespace: {value:?}")]
    Whitespace { kind: &'static str, value: String },
}
