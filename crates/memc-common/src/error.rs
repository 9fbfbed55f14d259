//! Error types shared by memc-load crates

use thiserror::Error;

/// Result type alias for shared operations
pub type Result<T> = std::result::Result<T, MemcError>;

/// Failures that are not specific to one pipeline stage
#[derive(Error, Debug)]
pub enum MemcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MemcError {
    pub fn config(msg: impl Into<String>) -> Self {
        MemcError::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = MemcError::config("buffer size must be greater than 0");
        assert_eq!(
            err.to_string(),
            "Configuration error: buffer size must be greater than 0"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MemcError = io.into();
        assert!(matches!(err, MemcError::Io(_)));
    }
}
