use crate::envelope::BatchList;
use crate::error::{ProtocolError, ProtocolResult};
use crate::message::MAX_BATCH_SIZE;

/// Binary encoding of batch lists for `POST /batches`.
pub struct BatchCodec;

impl BatchCodec {
    pub fn encode(list: &BatchList) -> ProtocolResult<Vec<u8>> {
        let bytes =
            bincode::serialize(list).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        if bytes.len() > MAX_BATCH_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: bytes.len(),
                max: MAX_BATCH_SIZE,
            });
        }
        Ok(bytes)
    }

    /// Decode with the default size cap.
    pub fn decode(data: &[u8]) -> ProtocolResult<BatchList> {
        Self::decode_with_limit(data, MAX_BATCH_SIZE)
    }

    pub fn decode_with_limit(data: &[u8], max: usize) -> ProtocolResult<BatchList> {
        if data.len() > max {
            return Err(ProtocolError::MessageTooLarge { size: data.len(), max });
        }
        if data.is_empty() {
            return Err(ProtocolError::Deserialization("empty body".into()));
        }
        let list: BatchList = bincode::deserialize(data)
            .map_err(|e| ProtocolError::Deserialization(e.to_string()))?;
        Ok(list)
    }
}
