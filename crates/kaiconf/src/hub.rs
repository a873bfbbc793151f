//! Hub connection settings - endpoint, retry loop and handshake limits.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the SDK reaches the hub and how patient it is about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Websocket endpoint of the local hub.
    /// Default: ws://localhost:2203
    #[serde(default = "HubConfig::default_endpoint")]
    pub endpoint: String,

    /// Fixed delay between connection attempts, in milliseconds.
    /// Default: 2000
    #[serde(default = "HubConfig::default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Consecutive failed connection attempts before giving up.
    /// Default: unset (retry forever)
    #[serde(default)]
    pub max_retries: Option<u32>,

    /// Time allowed between socket open and a successful authentication reply.
    /// Default: unset (wait forever)
    #[serde(default)]
    pub handshake_timeout_ms: Option<u64>,
}

impl HubConfig {
    fn default_endpoint() -> String {
        "ws://localhost:2203".to_string()
    }

    fn default_retry_delay_ms() -> u64 {
        2000
    }

    /// Use a different endpoint (tests point this at a loopback fake hub).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Retry policy for the connect loop.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            delay: Duration::from_millis(self.retry_delay_ms),
            max_retries: self.max_retries,
        }
    }

    /// Handshake timeout, if one is configured.
    pub fn handshake_timeout(&self) -> Option<Duration> {
        self.handshake_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            retry_delay_ms: Self::default_retry_delay_ms(),
            max_retries: None,
            handshake_timeout_ms: None,
        }
    }
}

/// Fixed-delay retry policy. No backoff curve: every failed attempt waits the
/// same delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    pub max_retries: Option<u32>,
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `failures` consecutive failures.
    pub fn should_retry(&self, failures: u32) -> bool {
        match self.max_retries {
            Some(max) => failures < max,
            None => true,
        }
    }
}

/// Logging configuration for binaries embedding the SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// `tracing_subscriber::EnvFilter` directive (trace, debug, info, ...).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
