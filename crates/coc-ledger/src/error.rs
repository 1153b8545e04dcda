use coc_types::TypeError;

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The transaction must not be applied. No state is written.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("validation error: {0}")]
    Validation(#[from] TypeError),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store error: {0}")]
    StoreError(String),
}

/// Convenience alias.
pub type LedgerResult<T> = Result<T, LedgerError>;
