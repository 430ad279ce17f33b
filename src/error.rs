use {
    log::warn,
    serde::{Deserialize, Serialize},
    solana_client::client_error::{ClientError, ClientErrorKind},
    std::{fmt, future::Future, time::Duration},
    thiserror::Error,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DashboardError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Coarse classification used for metric labels and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Validation,
    Api,
    Timeout,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Validation => "validation",
            ErrorKind::Api => "api",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DashboardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DashboardError::Network(_) => ErrorKind::Network,
            DashboardError::Validation(_) => ErrorKind::Validation,
            DashboardError::Api(_) => ErrorKind::Api,
            DashboardError::Timeout(_) => ErrorKind::Timeout,
            DashboardError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            DashboardError::Network(msg)
            | DashboardError::Validation(msg)
            | DashboardError::Api(msg)
            | DashboardError::Timeout(msg)
            | DashboardError::Unknown(msg) => msg,
        }
    }

    /// Connectivity, provider and timeout failures are worth another attempt.
    /// Bad input and unclassified failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Network | ErrorKind::Api | ErrorKind::Timeout
        )
    }

    /// Message shown next to the affected panel.
    pub fn display_message(&self) -> String {
        let prefix = match self.kind() {
            ErrorKind::Network => "[network]",
            ErrorKind::Validation => "[invalid]",
            ErrorKind::Api => "[api]",
            ErrorKind::Timeout => "[timeout]",
            ErrorKind::Unknown => "[error]",
        };
        format!("{} {}", prefix, self.message())
    }
}

impl From<ClientError> for DashboardError {
    fn from(err: ClientError) -> Self {
        match err.kind() {
            ClientErrorKind::Reqwest(e) => DashboardError::from_reqwest(e),
            ClientErrorKind::Io(e) => DashboardError::Network(format!("RPC connection failed: {}", e)),
            ClientErrorKind::RpcError(e) => DashboardError::Api(format!("RPC error: {}", e)),
            ClientErrorKind::SerdeJson(e) => {
                DashboardError::Api(format!("Malformed RPC response: {}", e))
            }
            _ => {
                let message = err.to_string();
                if message.to_lowercase().contains("timed out") {
                    DashboardError::Timeout(message)
                } else {
                    DashboardError::Unknown(message)
                }
            }
        }
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        DashboardError::from_reqwest(&err)
    }
}

impl DashboardError {
    fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            DashboardError::Timeout(format!("Request took too long to complete: {}", err))
        } else if err.is_connect() || err.is_request() {
            DashboardError::Network(format!("Connection failed: {}", err))
        } else if let Some(status) = err.status() {
            DashboardError::Api(format!("Provider returned {}", status))
        } else if err.is_decode() {
            DashboardError::Api(format!("Malformed provider response: {}", err))
        } else {
            DashboardError::Unknown(err.to_string())
        }
    }
}

/// Exponential backoff for explicit, caller-driven retries.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (zero-based): base * 2^attempt, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    pub fn should_retry(&self, err: &DashboardError, attempts_made: u32) -> bool {
        err.is_retryable() && attempts_made < self.max_attempts
    }
}

pub async fn retry_with_backoff<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, DashboardError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DashboardError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if !policy.should_retry(&e, attempt) {
                    return Err(e);
                }
                let delay = policy.delay_for(attempt - 1);
                warn!(
                    "Attempt {}/{} failed ({}), retrying in {} ms",
                    attempt,
                    policy.max_attempts,
                    e,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
