use async_trait::async_trait;
use coc_protocol::{
    endpoints, BatchCodec, BatchList, BatchStatus, BatchStatusResponse, StateResponse,
    SubmitResponse, TransactionResource, TransactionsResponse,
};
use coc_types::LedgerAddress;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{SdkError, SdkResult};
use crate::gateway::{LedgerGateway, SubmissionReceipt};

/// HTTP client for a ledger gateway.
#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpLedgerClient {
    /// Build a client with the configured per-request timeout.
    pub fn new(config: &ClientConfig) -> SdkResult<Self> {
        let base = config.gateway()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SdkError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> SdkResult<reqwest::Response> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                SdkError::Gateway(format!("{endpoint}: request timed out"))
            } else {
                SdkError::Gateway(format!("{endpoint}: {e}"))
            }
        })
    }

    async fn expect_success(
        resp: reqwest::Response,
        endpoint: &str,
    ) -> SdkResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        tracing::warn!(endpoint, status = status.as_u16(), "gateway returned error status");
        Err(SdkError::GatewayStatus {
            status: status.as_u16(),
            body,
        })
    }

    async fn json<T: DeserializeOwned>(resp: reqwest::Response, endpoint: &str) -> SdkResult<T> {
        resp.json::<T>()
            .await
            .map_err(|e| SdkError::Decode(format!("{endpoint}: {e}")))
    }
}

#[async_trait]
impl LedgerGateway for HttpLedgerClient {
    async fn submit(&self, batches: &BatchList) -> SdkResult<SubmissionReceipt> {
        let body = BatchCodec::encode(batches)?;
        let request = self
            .http
            .post(self.url(endpoints::BATCHES))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body);
        let resp = self.send(request, endpoints::BATCHES).await?;
        let resp = Self::expect_success(resp, endpoints::BATCHES).await?;
        let ack: SubmitResponse = Self::json(resp, endpoints::BATCHES).await?;
        tracing::info!(link = %ack.link, "batch accepted by gateway");
        Ok(SubmissionReceipt { link: ack.link })
    }

    async fn read_state(&self, address: &LedgerAddress) -> SdkResult<Option<String>> {
        let path = endpoints::state_path(address.as_str());
        let resp = self.send(self.http.get(self.url(&path)), endpoints::STATE).await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(address = %address.short(), "no state at address");
            return Ok(None);
        }
        let resp = Self::expect_success(resp, endpoints::STATE).await?;
        let state: StateResponse = Self::json(resp, endpoints::STATE).await?;
        Ok(Some(state.data))
    }

    async fn list_transactions(&self) -> SdkResult<Vec<TransactionResource>> {
        let resp = self
            .send(self.http.get(self.url(endpoints::TRANSACTIONS)), endpoints::TRANSACTIONS)
            .await?;
        let resp = Self::expect_success(resp, endpoints::TRANSACTIONS).await?;
        let list: TransactionsResponse = Self::json(resp, endpoints::TRANSACTIONS).await?;
        Ok(list.data)
    }

    async fn batch_status(&self, batch_id: &str) -> SdkResult<BatchStatus> {
        let request = self
            .http
            .get(self.url(endpoints::BATCH_STATUSES))
            .query(&[("id", batch_id)]);
        let resp = self.send(request, endpoints::BATCH_STATUSES).await?;
        let resp = Self::expect_success(resp, endpoints::BATCH_STATUSES).await?;
        let statuses: BatchStatusResponse = Self::json(resp, endpoints::BATCH_STATUSES).await?;
        Ok(statuses
            .data
            .into_iter()
            .find(|entry| entry.id == batch_id)
            .map(|entry| entry.status)
            .unwrap_or(BatchStatus::Unknown))
    }
}
