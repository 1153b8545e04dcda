//! Batch intake and delayed commit.
//!
//! A submitted batch list is decoded and verified synchronously, every batch
//! in it is marked PENDING, and a background task applies them after the
//! configured commit delay. Commits are serialized behind a single lock, so
//! the handler's read-modify-write of an address never interleaves with
//! another commit.
//!
//! Batch statuses live in memory. Settled ones are kept up to
//! `max_tracked_statuses` and evicted oldest first.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use coc_ledger::{
    CustodyLedgerHandler, InMemoryStateStore, LedgerResult, StateDelta, StateReader, StateWriter,
};
use coc_protocol::{
    BatchCodec, BatchStatus, BatchStatusEntry, InvalidTransactionInfo, TransactionResource,
    VerifiedTransaction,
};
use coc_types::LedgerAddress;
use tokio::sync::{Mutex, RwLock};

use crate::config::GatewayConfig;
use crate::error::GatewayResult;

pub struct BatchProcessor {
    handler: CustodyLedgerHandler,
    store: InMemoryStateStore,
    commit_lock: Mutex<()>,
    statuses: RwLock<StatusBook>,
    committed: RwLock<Vec<TransactionResource>>,
    commit_delay: Duration,
    max_batch_size: usize,
}

impl BatchProcessor {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            handler: CustodyLedgerHandler::new(config.handler.clone()),
            store: InMemoryStateStore::new(),
            commit_lock: Mutex::new(()),
            statuses: RwLock::new(StatusBook::new(config.max_tracked_statuses)),
            committed: RwLock::new(Vec::new()),
            commit_delay: config.commit_delay(),
            max_batch_size: config.max_batch_size,
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Decode, verify and queue a submitted body. Returns the batch ids.
    ///
    /// Nothing is queued unless every batch in the list verifies.
    pub async fn accept(self: &Arc<Self>, body: &[u8]) -> GatewayResult<Vec<String>> {
        let list = BatchCodec::decode_with_limit(body, self.max_batch_size)?;
        let verified = list.verify()?;

        let ids: Vec<String> = verified.iter().map(|(id, _)| id.clone()).collect();
        {
            let mut statuses = self.statuses.write().await;
            for id in &ids {
                statuses.pending(id);
            }
        }
        tracing::info!(batches = ids.len(), bytes = body.len(), "batch list accepted");

        let processor = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(processor.commit_delay).await;
            for (batch_id, transactions) in verified {
                processor.commit(&batch_id, transactions).await;
            }
        });

        Ok(ids)
    }

    /// Apply one batch atomically: either every transaction is written or
    /// none is and the batch is marked INVALID.
    async fn commit(&self, batch_id: &str, transactions: Vec<VerifiedTransaction>) {
        let _guard = self.commit_lock.lock().await;

        let mut overlay = Overlay::new(&self.store);
        let mut failure = None;
        for tx in &transactions {
            match self.handler.apply(&tx.apply_request(), &overlay) {
                Ok(delta) => overlay.stage(delta),
                Err(e) => {
                    failure = Some(InvalidTransactionInfo {
                        id: tx.id.clone(),
                        message: e.to_string(),
                    });
                    break;
                }
            }
        }

        let entry = match failure {
            Some(invalid) => {
                tracing::warn!(batch_id, transaction_id = %invalid.id, reason = %invalid.message, "batch rejected");
                BatchStatusEntry {
                    id: batch_id.to_string(),
                    status: BatchStatus::Invalid,
                    invalid_transactions: vec![invalid],
                }
            }
            None => match overlay.flush() {
                Ok(written) => {
                    let mut committed = self.committed.write().await;
                    committed.extend(
                        transactions
                            .iter()
                            .map(|tx| TransactionResource::new(tx.header.clone(), tx.id.clone(), &tx.payload)),
                    );
                    tracing::info!(batch_id, transactions = transactions.len(), addresses = written, "batch committed");
                    BatchStatusEntry {
                        id: batch_id.to_string(),
                        status: BatchStatus::Committed,
                        invalid_transactions: Vec::new(),
                    }
                }
                Err(e) => {
                    tracing::error!(batch_id, error = %e, "state write failed");
                    BatchStatusEntry {
                        id: batch_id.to_string(),
                        status: BatchStatus::Invalid,
                        invalid_transactions: Vec::new(),
                    }
                }
            },
        };
        self.statuses.write().await.settle(entry);
    }

    /// Raw bytes stored at `address`.
    pub fn state(&self, address: &LedgerAddress) -> GatewayResult<Option<Vec<u8>>> {
        Ok(self.store.get(address)?)
    }

    /// Committed transactions in commit order.
    pub async fn transactions(&self) -> Vec<TransactionResource> {
        self.committed.read().await.clone()
    }

    pub async fn status(&self, batch_id: &str) -> BatchStatusEntry {
        self.statuses
            .read()
            .await
            .entries
            .get(batch_id)
            .cloned()
            .unwrap_or_else(|| BatchStatusEntry {
                id: batch_id.to_string(),
                status: BatchStatus::Unknown,
                invalid_transactions: Vec::new(),
            })
    }
}

/// Batch statuses by id. Only settled entries count against the cap.
struct StatusBook {
    entries: HashMap<String, BatchStatusEntry>,
    settled: VecDeque<String>,
    cap: usize,
}

impl StatusBook {
    fn new(cap: usize) -> Self {
        Self {
            entries: HashMap::new(),
            settled: VecDeque::new(),
            cap,
        }
    }

    fn pending(&mut self, id: &str) {
        self.entries.insert(
            id.to_string(),
            BatchStatusEntry {
                id: id.to_string(),
                status: BatchStatus::Pending,
                invalid_transactions: Vec::new(),
            },
        );
    }

    fn settle(&mut self, entry: BatchStatusEntry) {
        let id = entry.id.clone();
        if self.entries.insert(id.clone(), entry).map(|e| e.status) != Some(BatchStatus::Pending) {
            self.settled.retain(|known| known != &id);
        }
        self.settled.push_back(id);
        while self.settled.len() > self.cap {
            if let Some(oldest) = self.settled.pop_front() {
                self.entries.remove(&oldest);
                tracing::debug!(batch_id = %oldest, "batch status evicted");
            }
        }
    }
}

/// Staged writes over the committed store, so later transactions in a batch
/// see earlier ones.
struct Overlay<'a> {
    base: &'a InMemoryStateStore,
    staged: BTreeMap<LedgerAddress, StateDelta>,
}

impl<'a> Overlay<'a> {
    fn new(base: &'a InMemoryStateStore) -> Self {
        Self {
            base,
            staged: BTreeMap::new(),
        }
    }

    fn stage(&mut self, delta: StateDelta) {
        self.staged.insert(delta.address.clone(), delta);
    }

    fn flush(self) -> LedgerResult<usize> {
        for delta in self.staged.values() {
            self.base.apply_delta(delta)?;
        }
        Ok(self.staged.len())
    }
}

impl StateReader for Overlay<'_> {
    fn get(&self, address: &LedgerAddress) -> LedgerResult<Option<Vec<u8>>> {
        match self.staged.get(address) {
            Some(delta) => Ok(Some(delta.value.clone())),
            None => self.base.get(address),
        }
    }

    fn addresses(&self) -> LedgerResult<Vec<LedgerAddress>> {
        let mut all = self.base.addresses()?;
        all.extend(self.staged.keys().cloned());
        all.sort();
        all.dedup();
        Ok(all)
    }
}
