use coc_crypto::CryptoError;
use coc_ledger::LedgerError;
use coc_protocol::ProtocolError;
use coc_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    /// Caller input is incomplete or malformed. Nothing was submitted.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("signing failed: {0}")]
    Signing(String),

    /// Transport failure or request timeout talking to the gateway.
    #[error("gateway unreachable: {0}")]
    Gateway(String),

    /// The gateway answered with a non-success status.
    #[error("gateway returned {status}: {body}")]
    GatewayStatus { status: u16, body: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("decode error: {0}")]
    Decode(String),

    /// The record was submitted but is not yet visible in state.
    #[error("not yet visible after {attempts} attempts, try again later")]
    Timeout { attempts: u32 },

    #[error("operation cancelled")]
    Cancelled,

    #[error("key error: {0}")]
    Key(#[from] CryptoError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SdkError {
    /// Whether this is a gateway-side failure, either transport or status.
    pub fn is_gateway(&self) -> bool {
        matches!(self, Self::Gateway(_) | Self::GatewayStatus { .. })
    }
}

impl From<TypeError> for SdkError {
    fn from(e: TypeError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<LedgerError> for SdkError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Validation(inner) => Self::Validation(inner.to_string()),
            LedgerError::InvalidTransaction(msg) => Self::Validation(msg),
            LedgerError::Decode(msg) => Self::Decode(msg),
            other => Self::Decode(other.to_string()),
        }
    }
}

impl From<ProtocolError> for SdkError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::Signing(msg) => Self::Signing(msg),
            ProtocolError::Deserialization(msg) => Self::Decode(msg),
            other => Self::Validation(other.to_string()),
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_tells_caller_to_retry() {
        let msg = SdkError::Timeout { attempts: 10 }.to_string();
        assert!(msg.contains("not yet visible"));
        assert!(msg.ends_with("try again later"));
    }

    #[test]
    fn conversions_keep_category() {
        let e: SdkError = TypeError::MissingFields(vec!["caseNum"]).into();
        assert!(matches!(e, SdkError::Validation(ref m) if m.contains("caseNum")));

        let e: SdkError = LedgerError::Decode("bad json".into()).into();
        assert!(matches!(e, SdkError::Decode(_)));

        let e: SdkError = ProtocolError::Signing("hsm offline".into()).into();
        assert!(matches!(e, SdkError::Signing(_)));

        let e: SdkError = CryptoError::WrongPassphrase.into();
        assert_eq!(e.to_string(), "key error: wrong passphrase");
    }

    #[test]
    fn gateway_classification() {
        assert!(SdkError::Gateway("refused".into()).is_gateway());
        assert!(SdkError::GatewayStatus { status: 503, body: String::new() }.is_gateway());
        assert!(!SdkError::Cancelled.is_gateway());
    }
}
