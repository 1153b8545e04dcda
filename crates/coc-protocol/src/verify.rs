use coc_crypto::{verify_sha512_hex, Signature, VerifyingKey};
use coc_ledger::ApplyRequest;

use crate::envelope::{Batch, BatchList, TransactionHeader};
use crate::error::{ProtocolError, ProtocolResult};

/// A transaction whose signatures and payload hash have been checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedTransaction {
    pub id: String,
    pub header: TransactionHeader,
    pub payload: Vec<u8>,
}

impl VerifiedTransaction {
    /// The handler's view of this transaction.
    pub fn apply_request(&self) -> ApplyRequest {
        ApplyRequest {
            signer_public_key: self.header.signer_public_key.clone(),
            family_name: self.header.family_name.clone(),
            family_version: self.header.family_version.clone(),
            inputs: self.header.inputs.clone(),
            outputs: self.header.outputs.clone(),
            payload: self.payload.clone(),
        }
    }
}

impl Batch {
    /// Check the batch signature, the transaction id list, every header
    /// signature, every payload hash, and that each transaction names the
    /// batch signer as its batcher.
    pub fn verify(&self) -> ProtocolResult<Vec<VerifiedTransaction>> {
        let header = self.decode_header()?;
        let batcher = parse_key(&header.signer_public_key)?;
        check_signature(&batcher, &self.header, &self.header_signature, "batch")?;

        if self.transactions.is_empty() {
            return Err(ProtocolError::InvalidBatch("batch has no transactions".into()));
        }
        let ids: Vec<&str> = self.transactions.iter().map(|t| t.id()).collect();
        if header.transaction_ids.iter().map(String::as_str).ne(ids.iter().copied()) {
            return Err(ProtocolError::InvalidBatch(
                "transaction ids do not match batch header".into(),
            ));
        }

        let mut verified = Vec::with_capacity(self.transactions.len());
        for tx in &self.transactions {
            let tx_header = tx.decode_header()?;
            let signer = parse_key(&tx_header.signer_public_key)?;
            check_signature(&signer, &tx.header, &tx.header_signature, "transaction")?;

            if tx_header.batcher_public_key != header.signer_public_key {
                return Err(ProtocolError::InvalidBatch(format!(
                    "transaction {} names a different batcher",
                    short(tx.id())
                )));
            }
            if !verify_sha512_hex(&tx.payload, &tx_header.payload_sha512) {
                return Err(ProtocolError::InvalidBatch(format!(
                    "payload hash mismatch in transaction {}",
                    short(tx.id())
                )));
            }
            verified.push(VerifiedTransaction {
                id: tx.header_signature.clone(),
                header: tx_header,
                payload: tx.payload.clone(),
            });
        }
        Ok(verified)
    }
}

impl BatchList {
    /// Verify every batch, failing on the first invalid one.
    pub fn verify(&self) -> ProtocolResult<Vec<(String, Vec<VerifiedTransaction>)>> {
        if self.batches.is_empty() {
            return Err(ProtocolError::InvalidBatch("batch list is empty".into()));
        }
        self.batches
            .iter()
            .map(|b| Ok((b.id().to_string(), b.verify()?)))
            .collect()
    }
}

fn parse_key(hex_key: &str) -> ProtocolResult<VerifyingKey> {
    VerifyingKey::from_hex(hex_key)
        .map_err(|e| ProtocolError::InvalidSignature(format!("bad public key: {e}")))
}

fn check_signature(
    key: &VerifyingKey,
    message: &[u8],
    signature_hex: &str,
    what: &str,
) -> ProtocolResult<()> {
    let signature = Signature::from_hex(signature_hex)
        .map_err(|_| ProtocolError::InvalidSignature(format!("malformed {what} signature")))?;
    key.verify(message, &signature)
        .map_err(|_| ProtocolError::InvalidSignature(format!("{what} signature does not verify")))
}

fn short(id: &str) -> &str {
    &id[..id.len().min(16)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{EnvelopeBuilder, SignedEnvelope};
    use coc_crypto::{sha512_hex, Signer, SigningKey};
    use coc_ledger::AddressCodec;

    fn envelope(key: &SigningKey) -> SignedEnvelope {
        EnvelopeBuilder::default()
            .build(
                key,
                &AddressCodec::custody("2024-001", "abc123"),
                br#"{"caseNum":"2024-001","imageHash":"abc123"}"#.to_vec(),
            )
            .unwrap()
    }

    #[test]
    fn untouched_batch_verifies() {
        let key = SigningKey::generate();
        let env = envelope(&key);
        let verified = env.batch.verify().unwrap();
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].id, env.transaction_id());

        let request = verified[0].apply_request();
        assert_eq!(request.signer_public_key, key.public_key_hex());
        assert_eq!(request.inputs, vec![env.address.to_string()]);
        assert_eq!(request.family_name, "coc");
    }

    #[test]
    fn tampered_payload_is_detected() {
        let env = envelope(&SigningKey::generate());
        let mut batch = env.batch;
        batch.transactions[0].payload = br#"{"caseNum":"2024-999"}"#.to_vec();
        let err = batch.verify().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidBatch(ref m) if m.contains("payload hash")));
    }

    #[test]
    fn tampered_transaction_header_is_detected() {
        let env = envelope(&SigningKey::generate());
        let mut batch = env.batch;
        let mut header = batch.transactions[0].decode_header().unwrap();
        header.outputs = vec![AddressCodec::namespace_prefix()];
        batch.transactions[0].header = header.encode().unwrap();
        assert!(matches!(batch.verify(), Err(ProtocolError::InvalidSignature(_))));
    }

    #[test]
    fn tampered_batch_header_is_detected() {
        let env = envelope(&SigningKey::generate());
        let mut batch = env.batch;
        let mut header = batch.decode_header().unwrap();
        header.transaction_ids.push("ff".repeat(64));
        batch.header = header.encode().unwrap();
        assert!(matches!(batch.verify(), Err(ProtocolError::InvalidSignature(_))));
    }

    #[test]
    fn payload_swap_with_matching_hash_still_needs_signature() {
        let env = envelope(&SigningKey::generate());
        let mut batch = env.batch;
        let forged = b"{}".to_vec();
        let mut header = batch.transactions[0].decode_header().unwrap();
        header.payload_sha512 = sha512_hex(&forged);
        batch.transactions[0].header = header.encode().unwrap();
        batch.transactions[0].payload = forged;
        assert!(batch.verify().is_err());
    }

    #[test]
    fn resigned_batch_by_other_key_is_rejected() {
        let original = SigningKey::generate();
        let intruder = SigningKey::generate();
        let env = envelope(&original);
        let mut batch = env.batch;
        let mut header = batch.decode_header().unwrap();
        header.signer_public_key = intruder.public_key_hex();
        batch.header = header.encode().unwrap();
        batch.header_signature = intruder.sign(&batch.header).to_hex();
        let err = batch.verify().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidBatch(ref m) if m.contains("batcher")));
    }

    #[test]
    fn empty_batch_list_is_invalid() {
        assert!(BatchList::default().verify().is_err());
    }
}
