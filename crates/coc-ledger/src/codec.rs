use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use coc_types::{CustodyRecord, LedgerState};

use crate::error::{LedgerError, LedgerResult};

/// Encoding of ledger state and transaction payloads.
///
/// State is stored as UTF-8 JSON (`{"entries": [...]}`) and crosses the
/// gateway boundary as base64 of those bytes. Decoding is tolerant of missing
/// optional fields; only structurally malformed input is an error.
pub struct RecordCodec;

impl RecordCodec {
    pub fn encode(state: &LedgerState) -> LedgerResult<Vec<u8>> {
        serde_json::to_vec(state).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> LedgerResult<LedgerState> {
        serde_json::from_slice(bytes).map_err(|e| LedgerError::Decode(e.to_string()))
    }

    /// `base64(JSON(state))`, the form served by `GET /state/{address}`.
    pub fn to_transport(state: &LedgerState) -> LedgerResult<String> {
        Ok(Self::bytes_to_transport(&Self::encode(state)?))
    }

    pub fn decode_transport(data: &str) -> LedgerResult<LedgerState> {
        Self::decode(&Self::transport_to_bytes(data)?)
    }

    /// Base64 wrapper for already-encoded state bytes.
    pub fn bytes_to_transport(bytes: &[u8]) -> String {
        BASE64.encode(bytes)
    }

    pub fn transport_to_bytes(data: &str) -> LedgerResult<Vec<u8>> {
        BASE64
            .decode(data.trim().as_bytes())
            .map_err(|e| LedgerError::Decode(format!("invalid base64: {e}")))
    }

    /// Transaction payload bytes for a single record.
    pub fn encode_payload(record: &CustodyRecord) -> LedgerResult<Vec<u8>> {
        serde_json::to_vec(record).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn decode_payload(bytes: &[u8]) -> LedgerResult<CustodyRecord> {
        serde_json::from_slice(bytes).map_err(|e| LedgerError::Decode(e.to_string()))
    }
}
