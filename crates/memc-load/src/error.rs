//! Errors that abort a loader run

use std::path::PathBuf;
use thiserror::Error;

use crate::device::DeviceType;

pub type Result<T> = std::result::Result<T, LoadError>;

#[derive(Debug, Error)]
pub enum LoadError {
    /// A record names a device type with no worker; the run stops here
    #[error("Unknown device type '{dev_type}' in {}", path.display())]
    UnknownCategory { dev_type: String, path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Worker queue for {0} closed before ingestion finished")]
    QueueClosed(DeviceType),

    #[error("Worker for {device_type} stopped abnormally: {source}")]
    WorkerFailed {
        device_type: DeviceType,
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("File ingestion stopped abnormally: {0}")]
    IngestionFailed(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Config(#[from] memc_common::MemcError),
}

impl LoadError {
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoadError::FileRead {
            path: path.into(),
            source,
        }
    }
}
