use coc_types::{FAMILY_NAME, FAMILY_VERSION};

/// HTTP endpoint paths exposed by a ledger gateway.
pub mod endpoints {
    pub const BATCHES: &str = "/batches";
    pub const STATE: &str = "/state";
    pub const TRANSACTIONS: &str = "/transactions";
    pub const BATCH_STATUSES: &str = "/batch_statuses";
    pub const HEALTH: &str = "/health";

    /// `/state/{address}`
    pub fn state_path(address: &str) -> String {
        format!("{STATE}/{address}")
    }

    /// `/batch_statuses?id={batch_id}`
    pub fn batch_status_link(batch_id: &str) -> String {
        format!("{BATCH_STATUSES}?id={batch_id}")
    }
}

/// Health check response.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub family_name: String,
    pub family_version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            family_name: FAMILY_NAME.into(),
            family_version: FAMILY_VERSION.into(),
        }
    }
}
