use async_trait::async_trait;
use coc_protocol::{BatchList, BatchStatus, TransactionResource};
use coc_types::LedgerAddress;
use serde::{Deserialize, Serialize};

use crate::error::SdkResult;

/// Acknowledgement of a submitted batch. Acceptance is not commitment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub link: String,
}

/// The ledger's HTTP read/write surface.
///
/// Flows and the confirmation poller depend only on this trait, so they run
/// the same against the HTTP client and against in-process fakes.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Submit a batch list for asynchronous commit.
    async fn submit(&self, batches: &BatchList) -> SdkResult<SubmissionReceipt>;

    /// Base64 state at `address`, or `None` if nothing is stored there.
    async fn read_state(&self, address: &LedgerAddress) -> SdkResult<Option<String>>;

    /// All committed transactions the gateway exposes.
    async fn list_transactions(&self) -> SdkResult<Vec<TransactionResource>>;

    /// Commit status of a previously submitted batch.
    async fn batch_status(&self, batch_id: &str) -> SdkResult<BatchStatus>;
}
