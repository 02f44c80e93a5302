use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::approval::DateEncoding;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub service: ServiceSettings,
    pub payload: PayloadSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceSettings {
    pub url: String,
    #[serde(default = "default_header_set")]
    pub header_set: String,
    #[serde(default = "default_items_navigation")]
    pub items_navigation: String,
    #[serde(default = "default_user_set")]
    pub user_set: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub sap_client: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// No default for the date encoding: the two backend contracts are
/// incompatible and the operator has to pick the one their service uses.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PayloadSettings {
    pub date_encoding: DateEncoding,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrySettings {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DisplaySettings {
    #[serde(default)]
    pub show_in_lakhs: bool,
}

fn default_header_set() -> String {
    "PaymentHeaderSet".to_string()
}

fn default_items_navigation() -> String {
    "ToItems".to_string()
}

fn default_user_set() -> String {
    "UserApprovalLevelSet".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}
