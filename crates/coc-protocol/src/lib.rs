//! Wire protocol for the chain-of-custody ledger.
//!
//! Defines the signed transaction/batch envelope, its binary encoding, the
//! verification a gateway runs before accepting a batch, and the JSON
//! messages exchanged with the gateway over HTTP.

pub mod codec;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod message;
pub mod verify;

pub use codec::BatchCodec;
pub use endpoint::{endpoints, HealthResponse};
pub use envelope::{
    Batch, BatchHeader, BatchList, EnvelopeBuilder, SignedEnvelope, Transaction, TransactionHeader,
};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{
    BatchStatus, BatchStatusEntry, BatchStatusResponse, ErrorBody, ErrorResponse, HeaderResource,
    InvalidTransactionInfo, StateResponse, SubmitResponse, TransactionResource,
    TransactionsResponse, MAX_BATCH_SIZE,
};
pub use verify::VerifiedTransaction;
