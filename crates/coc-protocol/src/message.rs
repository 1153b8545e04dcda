use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::envelope::TransactionHeader;

/// Largest accepted `POST /batches` body.
pub const MAX_BATCH_SIZE: usize = 10 * 1024 * 1024;

/// `POST /batches` response. `link` points at the batch status resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub link: String,
}

/// `GET /state/{address}` response. `data` is base64 of the stored bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateResponse {
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Header fields as exposed by `GET /transactions`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderResource {
    #[serde(default)]
    pub signer_public_key: String,
    #[serde(default)]
    pub batcher_public_key: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub family_version: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub payload_sha512: String,
}

impl From<TransactionHeader> for HeaderResource {
    fn from(h: TransactionHeader) -> Self {
        Self {
            signer_public_key: h.signer_public_key,
            batcher_public_key: h.batcher_public_key,
            family_name: h.family_name,
            family_version: h.family_version,
            inputs: h.inputs,
            outputs: h.outputs,
            nonce: h.nonce,
            dependencies: h.dependencies,
            payload_sha512: h.payload_sha512,
        }
    }
}

/// One committed transaction. `payload` is base64.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResource {
    pub header: HeaderResource,
    pub header_signature: String,
    pub payload: String,
}

impl TransactionResource {
    pub fn new(header: TransactionHeader, header_signature: String, payload: &[u8]) -> Self {
        Self {
            header: header.into(),
            header_signature,
            payload: BASE64.encode(payload),
        }
    }

    /// Raw payload bytes, if `payload` is valid base64.
    pub fn payload_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(self.payload.as_bytes())
    }
}

/// `GET /transactions` response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionsResponse {
    #[serde(default)]
    pub data: Vec<TransactionResource>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Pending,
    Committed,
    Invalid,
    Unknown,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Committed => "COMMITTED",
            Self::Invalid => "INVALID",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidTransactionInfo {
    pub id: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatusEntry {
    pub id: String,
    pub status: BatchStatus,
    #[serde(default)]
    pub invalid_transactions: Vec<InvalidTransactionInfo>,
}

/// `GET /batch_statuses?id=...` response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatusResponse {
    #[serde(default)]
    pub data: Vec<BatchStatusEntry>,
}

/// Error body returned by the gateway for non-success statuses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub title: String,
    pub message: String,
}
