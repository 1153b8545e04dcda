use std::sync::Arc;

use coc_ledger::{AddressCodec, RecordCodec};
use coc_protocol::EnvelopeBuilder;
use coc_types::{CustodyEvent, CustodyRecord, CustodyStatus, LedgerAddress, LedgerState};
use tokio_util::sync::CancellationToken;

use crate::config::PollerConfig;
use crate::error::{SdkError, SdkResult};
use crate::gateway::{LedgerGateway, SubmissionReceipt};
use crate::poller::ConfirmationPoller;
use crate::query::{CaseHistory, TransactionQuery, TransactionSummary};
use crate::session::Session;

/// What the gateway accepted for a single custody event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub address: LedgerAddress,
    pub transaction_id: String,
    pub batch_id: String,
    pub receipt: SubmissionReceipt,
}

/// A record that has become visible in state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirmed {
    pub latest: CustodyRecord,
    pub state: LedgerState,
}

/// Custody flows: register, update, search and history.
///
/// Holds no mutable state, so one client can drive any number of concurrent
/// flows for different addresses.
pub struct CustodyClient<G: ?Sized> {
    gateway: Arc<G>,
    builder: EnvelopeBuilder,
    poller: PollerConfig,
}

impl<G: LedgerGateway + ?Sized> CustodyClient<G> {
    pub fn new(gateway: Arc<G>, poller: PollerConfig) -> Self {
        Self {
            gateway,
            builder: EnvelopeBuilder::default(),
            poller,
        }
    }

    pub fn with_builder(mut self, builder: EnvelopeBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Validate, sign and submit one custody event.
    ///
    /// Submission is acceptance, not commitment; pair with [`confirm`] to
    /// wait for the record to appear. Updates go through here too: an update
    /// is just another event for the same case and image.
    ///
    /// [`confirm`]: CustodyClient::confirm
    pub async fn register(&self, session: &Session, event: CustodyEvent) -> SdkResult<Submission> {
        let record = event.into_payload(session.user_id());
        record.validate(false)?;
        let address = AddressCodec::for_record(&record)?;
        let payload = RecordCodec::encode_payload(&record)?;

        let envelope = self.builder.build(session.signer(), &address, payload)?;
        let transaction_id = envelope.transaction_id().to_string();
        let batch_id = envelope.batch_id().to_string();

        let receipt = self.gateway.submit(&envelope.into_batch_list()).await?;
        tracing::info!(
            address = %address.short(),
            transaction_id = %transaction_id,
            user_id = session.user_id(),
            "custody event submitted"
        );

        Ok(Submission {
            address,
            transaction_id,
            batch_id,
            receipt,
        })
    }

    /// Wait until `address` holds at least one entry.
    pub async fn confirm(
        &self,
        address: &LedgerAddress,
        token: &CancellationToken,
    ) -> SdkResult<Confirmed> {
        let poller = ConfirmationPoller::new(Arc::clone(&self.gateway), self.poller.clone());
        let state = poller.confirm(address, token).await?;
        let latest = state
            .latest()
            .cloned()
            .ok_or_else(|| SdkError::NotFound(address.to_string()))?;
        Ok(Confirmed { latest, state })
    }

    /// Current history at `address`.
    pub async fn search(&self, address: &LedgerAddress) -> SdkResult<LedgerState> {
        let data = self
            .gateway
            .read_state(address)
            .await?
            .ok_or_else(|| SdkError::NotFound(address.to_string()))?;
        let state = RecordCodec::decode_transport(&data)?;
        if state.is_empty() {
            return Err(SdkError::NotFound(address.to_string()));
        }
        Ok(state)
    }

    /// Pre-fill the next event for `address` from its latest entry.
    pub async fn prepare_update(
        &self,
        address: &LedgerAddress,
        status: CustodyStatus,
        registration_time: impl Into<String>,
    ) -> SdkResult<CustodyEvent> {
        let state = self.search(address).await?;
        let latest = state
            .latest()
            .ok_or_else(|| SdkError::NotFound(address.to_string()))?;
        Ok(CustodyEvent::follow_up(latest, status, registration_time))
    }

    /// Everything `public_key` has signed, grouped by case.
    pub async fn history(&self, public_key: &str) -> SdkResult<Vec<CaseHistory>> {
        let transactions = self.gateway.list_transactions().await?;
        let decoded = TransactionQuery::decode(&transactions);
        let mine = TransactionQuery::filter_by_signer(decoded, public_key);
        tracing::debug!(records = mine.len(), "history fetched");
        Ok(TransactionQuery::group_by_case(mine))
    }

    /// Display rows for everything `public_key` has signed.
    pub async fn my_transactions(&self, public_key: &str) -> SdkResult<Vec<TransactionSummary>> {
        let cases = self.history(public_key).await?;
        Ok(TransactionQuery::summarize(&cases))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coc_crypto::SigningKey;
    use coc_ledger::{CustodyLedgerHandler, InMemoryStateStore, StateReader, StateWriter};
    use coc_protocol::{BatchList, BatchStatus, HeaderResource, TransactionResource};
    use coc_types::DeviceType;
    use std::sync::Mutex;

    /// Verifies and applies every batch on submit, as a gateway with no
    /// commit delay would.
    #[derive(Default)]
    struct LoopbackGateway {
        handler: CustodyLedgerHandler,
        store: InMemoryStateStore,
        committed: Mutex<Vec<TransactionResource>>,
    }

    #[async_trait]
    impl LedgerGateway for LoopbackGateway {
        async fn submit(&self, batches: &BatchList) -> SdkResult<SubmissionReceipt> {
            let mut link = String::new();
            for (batch_id, transactions) in batches.verify()? {
                for tx in transactions {
                    let delta = self.handler.apply(&tx.apply_request(), &self.store)?;
                    self.store.apply_delta(&delta)?;
                    self.committed.lock().unwrap().push(TransactionResource::new(
                        tx.header.clone(),
                        tx.id.clone(),
                        &tx.payload,
                    ));
                }
                link = format!("/batch_statuses?id={batch_id}");
            }
            Ok(SubmissionReceipt { link })
        }

        async fn read_state(&self, address: &LedgerAddress) -> SdkResult<Option<String>> {
            Ok(self
                .store
                .get(address)?
                .map(|bytes| RecordCodec::bytes_to_transport(&bytes)))
        }

        async fn list_transactions(&self) -> SdkResult<Vec<TransactionResource>> {
            Ok(self.committed.lock().unwrap().clone())
        }

        async fn batch_status(&self, _batch_id: &str) -> SdkResult<BatchStatus> {
            Ok(BatchStatus::Committed)
        }
    }

    fn client() -> CustodyClient<LoopbackGateway> {
        CustodyClient::new(Arc::new(LoopbackGateway::default()), PollerConfig::default())
    }

    fn session(user: &str) -> Session {
        Session::new(user, Arc::new(SigningKey::generate())).unwrap()
    }

    fn event(case: &str, time: &str) -> CustodyEvent {
        CustodyEvent {
            registration_time: time.into(),
            status: CustodyStatus::Stored,
            case_num: case.into(),
            location: "Locker 4".into(),
            checker_name: "Kim".into(),
            device_type: DeviceType::Usb,
            image_type: Some("E01".into()),
            image_file_name: "usb.e01".into(),
            image_hash: "abc123".into(),
        }
    }

    #[tokio::test]
    async fn register_then_search() {
        let client = client();
        let alice = session("alice");

        let submission = client
            .register(&alice, event("2024-001", "2024-03-01T09:00"))
            .await
            .unwrap();
        assert_eq!(submission.address, AddressCodec::custody("2024-001", "abc123"));
        assert!(submission.receipt.link.contains(&submission.batch_id));
        assert_eq!(submission.transaction_id.len(), 128);

        let state = client.search(&submission.address).await.unwrap();
        assert_eq!(state.len(), 1);
        let latest = state.latest().unwrap();
        assert_eq!(latest.user_id.as_deref(), Some("alice"));
        assert_eq!(latest.owner.as_deref(), Some(alice.public_key().as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_returns_latest_entry() {
        let client = client();
        let alice = session("alice");
        let submission = client
            .register(&alice, event("2024-001", "2024-03-01T09:00"))
            .await
            .unwrap();

        let confirmed = client
            .confirm(&submission.address, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(confirmed.state.len(), 1);
        assert_eq!(confirmed.latest.case_num.as_deref(), Some("2024-001"));
    }

    #[tokio::test]
    async fn update_appends_to_same_address() {
        let client = client();
        let alice = session("alice");
        let first = client
            .register(&alice, event("2024-001", "2024-03-01T09:00"))
            .await
            .unwrap();

        let next = client
            .prepare_update(&first.address, CustodyStatus::Transferred, "2024-03-02T10:00")
            .await
            .unwrap();
        assert_eq!(next.image_hash, "abc123");
        let second = client.register(&alice, next).await.unwrap();
        assert_eq!(second.address, first.address);

        let state = client.search(&first.address).await.unwrap();
        assert_eq!(state.len(), 2);
        assert_eq!(state.latest().unwrap().status, Some(CustodyStatus::Transferred));
    }

    #[tokio::test]
    async fn invalid_event_is_not_submitted() {
        let client = client();
        let mut bad = event("2024-001", "2024-03-01T09:00");
        bad.location.clear();

        let err = client.register(&session("alice"), bad).await.unwrap_err();
        assert!(matches!(err, SdkError::Validation(_)));
        assert!(client.gateway().committed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_missing_address_is_not_found() {
        let err = client()
            .search(&AddressCodec::custody("nope", "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::NotFound(_)));
    }

    #[tokio::test]
    async fn history_is_per_signer_and_grouped() {
        let client = client();
        let alice = session("alice");
        let bob = session("bob");

        client.register(&alice, event("A", "2024-01-01T10:00")).await.unwrap();
        client.register(&bob, event("B", "2024-01-02T10:00")).await.unwrap();
        let mut later = event("C", "2024-01-03T10:00");
        later.image_hash = "def456".into();
        client.register(&alice, later).await.unwrap();

        // An unrelated family's transaction is ignored.
        client.gateway().committed.lock().unwrap().push(TransactionResource {
            header: HeaderResource {
                family_name: "intkey".into(),
                signer_public_key: alice.public_key(),
                ..Default::default()
            },
            header_signature: "foreign".into(),
            payload: "e30=".into(),
        });

        let cases = client.history(&alice.public_key()).await.unwrap();
        let names: Vec<_> = cases.iter().map(|c| c.case_num.as_str()).collect();
        assert_eq!(names, vec!["C", "A"]);

        let rows = client.my_transactions(&alice.public_key()).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].case_num.as_deref(), Some("C"));
        assert_eq!(rows[0].device_type.as_deref(), Some("USB"));
    }
}
