//! memc-load common library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Error handling and logging shared by the memc-load workspace members.
//!
//! - **Error Handling**: [`MemcError`] and its [`Result`] alias
//! - **Logging**: [`logging::LogConfig`] and [`logging::init_logging`]

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{MemcError, Result};
