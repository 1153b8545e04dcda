use coc_crypto::{sha512_hex, Signer};
use coc_types::{LedgerAddress, FAMILY_NAME, FAMILY_VERSION};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, ProtocolResult};

const NONCE_BYTES: usize = 16;

/// Signed portion of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHeader {
    pub family_name: String,
    pub family_version: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub signer_public_key: String,
    pub batcher_public_key: String,
    pub nonce: String,
    pub dependencies: Vec<String>,
    pub payload_sha512: String,
}

/// A transaction: encoded header, its signature, and the payload.
/// The hex header signature doubles as the transaction id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub header: Vec<u8>,
    pub header_signature: String,
    pub payload: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchHeader {
    pub signer_public_key: String,
    pub transaction_ids: Vec<String>,
}

/// An ordered, atomically applied group of transactions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub header: Vec<u8>,
    pub header_signature: String,
    pub transactions: Vec<Transaction>,
}

/// The unit posted to `POST /batches`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchList {
    pub batches: Vec<Batch>,
}

impl TransactionHeader {
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        bincode::deserialize(bytes).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}

impl BatchHeader {
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        bincode::deserialize(bytes).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}

impl Transaction {
    pub fn id(&self) -> &str {
        &self.header_signature
    }

    pub fn decode_header(&self) -> ProtocolResult<TransactionHeader> {
        TransactionHeader::decode(&self.header)
    }
}

impl Batch {
    pub fn id(&self) -> &str {
        &self.header_signature
    }

    pub fn decode_header(&self) -> ProtocolResult<BatchHeader> {
        BatchHeader::decode(&self.header)
    }
}

impl From<Batch> for BatchList {
    fn from(batch: Batch) -> Self {
        Self { batches: vec![batch] }
    }
}

/// A single custody transaction wrapped in its own signed batch, plus the
/// address it writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedEnvelope {
    pub address: LedgerAddress,
    pub batch: Batch,
}

impl SignedEnvelope {
    pub fn transaction(&self) -> Option<&Transaction> {
        self.batch.transactions.first()
    }

    pub fn transaction_id(&self) -> &str {
        self.transaction().map(Transaction::id).unwrap_or_default()
    }

    pub fn batch_id(&self) -> &str {
        self.batch.id()
    }

    pub fn into_batch_list(self) -> BatchList {
        BatchList::from(self.batch)
    }
}

/// Turns a payload into a signed single-transaction batch.
#[derive(Clone, Debug)]
pub struct EnvelopeBuilder {
    family_name: String,
    family_version: String,
}

impl Default for EnvelopeBuilder {
    fn default() -> Self {
        Self::new(FAMILY_NAME, FAMILY_VERSION)
    }
}

impl EnvelopeBuilder {
    pub fn new(family_name: impl Into<String>, family_version: impl Into<String>) -> Self {
        Self {
            family_name: family_name.into(),
            family_version: family_version.into(),
        }
    }

    /// Hash the payload, sign the transaction header, then wrap it in a batch
    /// signed by the same key. Inputs and outputs are exactly `[address]`.
    ///
    /// A signer failure aborts before anything leaves the process.
    pub fn build(
        &self,
        signer: &dyn Signer,
        address: &LedgerAddress,
        payload: Vec<u8>,
    ) -> ProtocolResult<SignedEnvelope> {
        let public_key = signer.public_key_hex();
        let header = TransactionHeader {
            family_name: self.family_name.clone(),
            family_version: self.family_version.clone(),
            inputs: vec![address.to_string()],
            outputs: vec![address.to_string()],
            signer_public_key: public_key.clone(),
            batcher_public_key: public_key.clone(),
            nonce: new_nonce(),
            dependencies: Vec::new(),
            payload_sha512: sha512_hex(&payload),
        };
        let header_bytes = header.encode()?;
        let header_signature = signer
            .try_sign(&header_bytes)
            .map_err(|e| ProtocolError::Signing(e.to_string()))?
            .to_hex();

        let transaction = Transaction {
            header: header_bytes,
            header_signature,
            payload,
        };

        let batch_header = BatchHeader {
            signer_public_key: public_key,
            transaction_ids: vec![transaction.header_signature.clone()],
        };
        let batch_header_bytes = batch_header.encode()?;
        let batch_signature = signer
            .try_sign(&batch_header_bytes)
            .map_err(|e| ProtocolError::Signing(e.to_string()))?
            .to_hex();

        tracing::debug!(
            address = %address.short(),
            transaction_id = %transaction.header_signature,
            "envelope signed"
        );

        Ok(SignedEnvelope {
            address: address.clone(),
            batch: Batch {
                header: batch_header_bytes,
                header_signature: batch_signature,
                transactions: vec![transaction],
            },
        })
    }
}

fn new_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
