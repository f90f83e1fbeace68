use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::retry::RetryPolicy;

pub const CODA_API_BASE: &str = "https://coda.io/apis/v1";

/// Tunables for [`TableClient`](crate::TableClient). Every field has a
/// default, so an empty `[client]` table is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub base_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Total attempts per request, first one included.
    pub max_attempts: u32,
    /// Rows requested per page.
    pub page_size: u32,
    /// Safety cap on pages followed by one `get_rows` call.
    pub max_pages: u32,
    /// Rows (or row ids) per write request.
    pub batch_size: usize,
    /// Wait after a 429 that carries no `Retry-After`.
    pub default_retry_after_secs: u64,
    /// Wait after a 5xx.
    pub server_error_delay_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: CODA_API_BASE.to_string(),
            timeout_secs: 300,
            max_attempts: 3,
            page_size: 100,
            max_pages: 100,
            batch_size: 40,
            default_retry_after_secs: 1,
            server_error_delay_secs: 5,
        }
    }
}

impl ClientSettings {
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::InvalidConfig("base_url must not be empty".into()));
        }
        let positive = [
            ("max_attempts", self.max_attempts as u64),
            ("page_size", self.page_size as u64),
            ("max_pages", self.max_pages as u64),
            ("batch_size", self.batch_size as u64),
            ("timeout_secs", self.timeout_secs),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ClientError::InvalidConfig(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            default_retry_after: Duration::from_secs(self.default_retry_after_secs),
            server_error_delay: Duration::from_secs(self.server_error_delay_secs),
        }
    }
}
