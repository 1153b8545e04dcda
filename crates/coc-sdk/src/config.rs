use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{SdkError, SdkResult};

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8008";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Gateway client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the gateway. Validated by [`ClientConfig::gateway`].
    pub gateway_url: String,
    /// Per-request bound, independent of the poll attempt cap.
    pub request_timeout_secs: u64,
    pub poller: PollerConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            poller: PollerConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(gateway_url: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `COC_GATEWAY_URL`, `COC_TIMEOUT_SECS` and
    /// `COC_POLL_MAX_ATTEMPTS` when set.
    pub fn from_env() -> SdkResult<Self> {
        let mut config = Self::default();
        if let Some(url) = env_var("COC_GATEWAY_URL") {
            parse_url(&url)?;
            config.gateway_url = url;
        }
        if let Some(secs) = env_var("COC_TIMEOUT_SECS") {
            config.request_timeout_secs = parse_number("COC_TIMEOUT_SECS", &secs)?;
        }
        if let Some(attempts) = env_var("COC_POLL_MAX_ATTEMPTS") {
            config.poller.max_attempts = parse_number("COC_POLL_MAX_ATTEMPTS", &attempts)?;
        }
        Ok(config)
    }

    pub fn with_gateway(mut self, url: &str) -> SdkResult<Self> {
        parse_url(url)?;
        self.gateway_url = url.to_string();
        Ok(self)
    }

    /// The parsed gateway URL.
    pub fn gateway(&self) -> SdkResult<Url> {
        parse_url(&self.gateway_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Confirmation polling schedule.
///
/// The poller waits `initial_delay`, then reads up to `max_attempts` times.
/// After miss `n` it sleeps `base_delay + (n - 1) * delay_step`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub base_delay_ms: u64,
    pub delay_step_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay_ms: 5_000,
            base_delay_ms: 3_000,
            delay_step_ms: 1_000,
        }
    }
}

impl PollerConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Sleep after the `attempt`-th miss (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let steps = u64::from(attempt.saturating_sub(1));
        Duration::from_millis(
            self.base_delay_ms
                .saturating_add(steps.saturating_mul(self.delay_step_ms)),
        )
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_url(raw: &str) -> SdkResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| SdkError::Config(format!("invalid gateway URL {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SdkError::Config(format!(
            "gateway URL must be http or https, got {}",
            url.scheme()
        )));
    }
    Ok(url)
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> SdkResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| SdkError::Config(format!("{name} must be a number, got {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule() {
        let poller = PollerConfig::default();
        assert_eq!(poller.max_attempts, 10);
        assert_eq!(poller.initial_delay(), Duration::from_secs(5));
        assert_eq!(poller.delay_after(1), Duration::from_secs(3));
        assert_eq!(poller.delay_after(2), Duration::from_secs(4));
        assert_eq!(poller.delay_after(10), Duration::from_secs(12));
    }

    #[test]
    fn default_client() {
        let config = ClientConfig::default();
        assert_eq!(config.gateway().unwrap().as_str(), "http://localhost:8008/");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn with_gateway_validates() {
        assert!(ClientConfig::default().with_gateway("http://10.0.0.5:8008").is_ok());
        assert!(matches!(
            ClientConfig::default().with_gateway("not a url"),
            Err(SdkError::Config(_))
        ));
        assert!(ClientConfig::default().with_gateway("ftp://host").is_err());
    }

    #[test]
    fn parse_number_reports_variable() {
        let err = parse_number::<u32>("COC_POLL_MAX_ATTEMPTS", "ten").unwrap_err();
        assert!(err.to_string().contains("COC_POLL_MAX_ATTEMPTS"));
    }
}
