use thiserror::Error;

/// Error type for every request the client issues.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection-level failure (DNS, TLS, refused, reset).
    #[error("network error: {0}")]
    Network(String),
    /// The request exceeded the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Non-retryable HTTP failure. `body` is the raw response text.
    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },
    /// 429/5xx on every attempt in the budget.
    #[error("request failed after {attempts} attempts (last status {last_status})")]
    RetryExhausted { attempts: u32, last_status: u16 },
    /// Response body did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),
    /// Bad base URL, unbuildable HTTP client, zero batch size, ...
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::RetryExhausted { last_status, .. } => Some(*last_status),
            _ => None,
        }
    }

    /// Whether the failure came from a status the retry loop treats as transient.
    pub fn is_transient(&self) -> bool {
        matches!(self.status(), Some(s) if s == 429 || s >= 500)
    }
}
