//! Collector configuration.
//!
//! Every field has a production default, so the CLI runs with no config file
//! present; a TOML file overrides any subset of fields.

use crate::error::CollectError;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectorConfig {
    /// Screener result page, paged with `v=<view>&o=-marketcap&r=<offset>`.
    pub screener_url: String,

    /// HKEX list-of-securities spreadsheet.
    pub hkex_listing_url: String,

    /// SGX securities prices API.
    pub sgx_prices_url: String,

    /// User agent sent with every request.
    pub user_agent: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Maximum retries after a timeout.
    pub max_retries: u32,

    /// Delay before the first retry, in seconds (doubles per retry).
    pub initial_delay_secs: u64,

    /// Name of the output folder searched for / created by
    /// [`resolve_data_dir`](crate::datadir::resolve_data_dir).
    pub data_folder: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            screener_url: "https://finviz.com/screener.ashx".into(),
            hkex_listing_url: "https://www.hkex.com.hk/eng/services/trading/securities/securitieslists/ListOfSecurities.xlsx".into(),
            sgx_prices_url: "https://api.sgx.com/securities/v1.1".into(),
            user_agent: crate::client::DEFAULT_USER_AGENT.into(),
            timeout_secs: 30,
            max_retries: 3,
            initial_delay_secs: 5,
            data_folder: "data".into(),
        }
    }
}

impl CollectorConfig {
    pub fn from_file(path: &Path) -> Result<Self, CollectError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CollectError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, CollectError> {
        toml::from_str(content).map_err(|e| CollectError::Config(format!("parse config: {e}")))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_secs(self.initial_delay_secs))
    }
}
