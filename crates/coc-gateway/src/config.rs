use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use coc_ledger::HandlerConfig;
use coc_protocol::MAX_BATCH_SIZE;
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};

pub const DEFAULT_PORT: u16 = 8008;
pub const DEFAULT_COMMIT_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_TRACKED_STATUSES: usize = 10_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    /// How long an accepted batch stays PENDING before it is applied.
    pub commit_delay_ms: u64,
    pub max_batch_size: usize,
    /// Settled batch statuses kept for `/batch_statuses`. The oldest are
    /// forgotten first and then report UNKNOWN. Pending batches always stay.
    pub max_tracked_statuses: usize,
    pub handler: HandlerConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            commit_delay_ms: DEFAULT_COMMIT_DELAY_MS,
            max_batch_size: MAX_BATCH_SIZE,
            max_tracked_statuses: DEFAULT_MAX_TRACKED_STATUSES,
            handler: HandlerConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml(text: &str) -> GatewayResult<Self> {
        toml::from_str(text).map_err(|e| GatewayError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> GatewayResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn commit_delay(&self) -> Duration {
        Duration::from_millis(self.commit_delay_ms)
    }
}
