/// Client configuration for transaction channels
use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Default number of iterator fragments the server sends per batch
pub const DEFAULT_BATCH_SIZE: u32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Fragments the server sends before waiting for a continue request
    pub batch_size: u32,

    /// Deadline for a unary call or a single iterator pull (None = wait
    /// until the channel fails)
    pub request_timeout: Option<Duration>,

    /// Deadline for establishing the gRPC connection
    pub connect_timeout: Duration,

    /// Attachments added to every outbound request (tracing data)
    pub metadata: HashMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            request_timeout: None,
            connect_timeout: Duration::from_secs(5),
            metadata: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the iterator batch size
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the per-call deadline
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the connection deadline
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Add one metadata attachment
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ClientError::InvalidConfig(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if let Some(timeout) = self.request_timeout {
            if timeout.is_zero() {
                return Err(ClientError::InvalidConfig(
                    "request_timeout must be greater than 0 when set".to_string(),
                ));
            }
        }

        if self.connect_timeout.is_zero() {
            return Err(ClientError::InvalidConfig(
                "connect_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
