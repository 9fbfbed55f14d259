//! Key-value store clients
//!
//! A [`KvStore`] is owned by exactly one sender task, so implementations take
//! `&mut self` and need no internal locking.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tracing::debug;

/// Longest key memcached accepts
pub const MAX_KEY_LEN: usize = 250;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Server rejected write: {0}")]
    Rejected(String),

    #[error("Connection closed by server")]
    Closed,

    #[error("Invalid key '{0}'")]
    InvalidKey(String),
}

/// Write side of a remote key-value store
#[async_trait]
pub trait KvStore: Send {
    /// Address used in log lines
    fn addr(&self) -> &str;

    /// Store `value` under `key`, overwriting any previous value
    async fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError>;
}

// ============================================================================
// memcached
// ============================================================================

/// memcached text-protocol client with a single lazily opened connection
///
/// Any failure drops the connection; the next `put` reconnects.
pub struct MemcacheClient {
    addr: String,
    timeout: Duration,
    conn: Option<BufStream<TcpStream>>,
}

impl MemcacheClient {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            conn: None,
        }
    }

    async fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        if self.conn.is_none() {
            debug!(addr = %self.addr, "Connecting to memcached");
            let stream = TcpStream::connect(&self.addr).await?;
            stream.set_nodelay(true)?;
            self.conn = Some(BufStream::new(stream));
        }
        let Some(conn) = self.conn.as_mut() else {
            return Err(StoreError::Closed);
        };

        conn.write_all(format!("set {} 0 0 {}\r\n", key, value.len()).as_bytes())
            .await?;
        conn.write_all(value).await?;
        conn.write_all(b"\r\n").await?;
        conn.flush().await?;

        let mut reply = String::new();
        if conn.read_line(&mut reply).await? == 0 {
            return Err(StoreError::Closed);
        }

        match reply.trim_end() {
            "STORED" => Ok(()),
            other => Err(StoreError::Rejected(other.to_string())),
        }
    }
}

#[async_trait]
impl KvStore for MemcacheClient {
    fn addr(&self) -> &str {
        &self.addr
    }

    async fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        validate_key(key)?;

        let result = match tokio::time::timeout(self.timeout, self.set(key, value)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        };

        if result.is_err() {
            // The stream may hold a half-written command or an unread reply
            self.conn = None;
        }
        result
    }
}

/// Keys must fit the text protocol: no whitespace or control bytes
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && !key.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control());

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
