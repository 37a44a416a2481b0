//! Configuration for the transfer service

use std::env;
use std::time::Duration;

/// Configuration for the transfer service
#[derive(Debug, Clone)]
pub struct TransferServiceConfig {
    /// Total time budget for acquiring exclusive access to both accounts
    pub acquire_timeout: Duration,
    /// Backoff between attempts to acquire a held exclusivity marker
    pub retry_backoff: Duration,
}

impl Default for TransferServiceConfig {
    fn default() -> Self {
        Self {
            acquire_timeout: Duration::from_millis(
                env::var("TRANSFER_ACQUIRE_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(100),
            ),
            retry_backoff: Duration::from_millis(
                env::var("TRANSFER_RETRY_BACKOFF_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

impl TransferServiceConfig {
    /// Create a new configuration using environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create a new configuration with custom values
    pub fn new(acquire_timeout: Duration, retry_backoff: Duration) -> Self {
        Self {
            acquire_timeout,
            retry_backoff,
        }
    }
}
