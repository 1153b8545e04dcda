use thiserror::Error;

/// Errors from signing, verification, and key storage.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("wrong passphrase")]
    WrongPassphrase,

    #[error("malformed key file: {0}")]
    MalformedKeyFile(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias.
pub type CryptoResult<T> = Result<T, CryptoError>;
