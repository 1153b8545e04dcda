use std::sync::Arc;
use std::time::Duration;

use coc_ledger::RecordCodec;
use coc_types::{LedgerAddress, LedgerState};
use tokio_util::sync::CancellationToken;

use crate::config::PollerConfig;
use crate::error::{SdkError, SdkResult};
use crate::gateway::LedgerGateway;

/// Waits for a submitted record to become visible in state.
///
/// Only "not yet visible" is retried. Gateway and decode failures end the
/// loop at once. Cancellation is observed before every read and raced
/// against every read and sleep; once cancelled no further call is made.
pub struct ConfirmationPoller<G: ?Sized> {
    gateway: Arc<G>,
    config: PollerConfig,
}

impl<G: LedgerGateway + ?Sized> ConfirmationPoller<G> {
    pub fn new(gateway: Arc<G>, config: PollerConfig) -> Self {
        Self { gateway, config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Poll `address` until it holds at least one entry.
    pub async fn confirm(
        &self,
        address: &LedgerAddress,
        token: &CancellationToken,
    ) -> SdkResult<LedgerState> {
        if token.is_cancelled() {
            return Err(SdkError::Cancelled);
        }
        sleep_or_cancel(self.config.initial_delay(), token).await?;

        for attempt in 1..=self.config.max_attempts {
            if token.is_cancelled() {
                return Err(SdkError::Cancelled);
            }
            let raw = tokio::select! {
                biased;
                () = token.cancelled() => return Err(SdkError::Cancelled),
                result = self.gateway.read_state(address) => result?,
            };

            if let Some(data) = raw {
                let state = RecordCodec::decode_transport(&data)?;
                if !state.is_empty() {
                    tracing::info!(
                        address = %address.short(),
                        attempt,
                        entries = state.len(),
                        "record confirmed"
                    );
                    return Ok(state);
                }
            }

            if attempt < self.config.max_attempts {
                let delay = self.config.delay_after(attempt);
                tracing::debug!(
                    address = %address.short(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "not yet visible, retrying"
                );
                sleep_or_cancel(delay, token).await?;
            }
        }

        tracing::warn!(
            address = %address.short(),
            attempts = self.config.max_attempts,
            "record not visible before attempt cap"
        );
        Err(SdkError::Timeout {
            attempts: self.config.max_attempts,
        })
    }
}

async fn sleep_or_cancel(delay: Duration, token: &CancellationToken) -> SdkResult<()> {
    tokio::select! {
        biased;
        () = token.cancelled() => Err(SdkError::Cancelled),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}
