//! Run configuration
//!
//! Built once in `main` before any worker starts and shared read-only
//! afterwards.

use memc_common::{MemcError, Result};
use serde::Serialize;
use std::time::Duration;

use crate::device::{DeviceMap, DeviceType};

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_PATTERN: &str = "/data/appsinstalled/*.tsv.gz";

/// Capacity of every per-category queue (inbound and send)
pub const DEFAULT_BUFFER_SIZE: usize = 30;

pub const DEFAULT_STORE_ATTEMPTS: u32 = 3;

pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(3);

/// Default memcached address for each device type
pub fn default_endpoint(device: DeviceType) -> &'static str {
    match device {
        DeviceType::Idfa => "127.0.0.1:33013",
        DeviceType::Gaid => "127.0.0.1:33014",
        DeviceType::Adid => "127.0.0.1:33015",
        DeviceType::Dvid => "127.0.0.1:33016",
    }
}

/// How many times a single record is written before it counts as failed
///
/// Attempts are immediate and every store error is treated the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_STORE_ATTEMPTS,
        }
    }
}

/// Operational parameters for one loader run
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    /// Glob selecting the input files
    pub pattern: String,
    /// memcached `host:port` per device type
    pub endpoints: DeviceMap<String>,
    /// Parse and log payloads without writing them
    pub dry_run: bool,
    pub retry: RetryPolicy,
    pub buffer_size: usize,
    #[serde(with = "duration_ms")]
    pub socket_timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            endpoints: DeviceMap::from_fn(|d| default_endpoint(d).to_string()),
            dry_run: false,
            retry: RetryPolicy::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
        }
    }
}

impl RunConfig {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    pub fn with_endpoint(mut self, device: DeviceType, addr: impl Into<String>) -> Self {
        self.endpoints[device] = addr.into();
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.pattern.trim().is_empty() {
            return Err(MemcError::config("input pattern must not be empty"));
        }
        if let Err(e) = glob::Pattern::new(&self.pattern) {
            return Err(MemcError::config(format!(
                "invalid input pattern '{}': {}",
                self.pattern, e
            )));
        }
        for (device, addr) in self.endpoints.iter() {
            if addr.trim().is_empty() {
                return Err(MemcError::config(format!("{} address must not be empty", device)));
            }
        }
        if self.buffer_size == 0 {
            return Err(MemcError::config("buffer size must be greater than 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(MemcError::config("store attempts must be greater than 0"));
        }
        if self.socket_timeout.is_zero() {
            return Err(MemcError::config("socket timeout must be greater than 0"));
        }
        Ok(())
    }

    /// One-line JSON summary for the start-up log
    pub fn summary(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}
