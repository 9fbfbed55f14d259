//! memc-load Library
//!
//! Bulk loader for installed-apps logs: gzip TSV files are parsed line by
//! line and each device record is written to the memcached instance serving
//! its device type.
//!
//! # Pipeline
//!
//! - **loader**: scans files on a blocking thread and routes records
//! - **worker**: one encoder task and one sender task per device type
//! - **store**: memcached text-protocol client with per-record retries
//! - **coordinator**: wires everything up and judges the error rate
//!
//! # Example
//!
//! ```no_run
//! use memc_load::{RunConfig, RunCoordinator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RunConfig::new("/data/appsinstalled/*.tsv.gz").with_dry_run(true);
//!     let outcome = RunCoordinator::new(config).run().await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod cli;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod device;
pub mod error;
pub mod loader;
pub mod parser;
pub mod selftest;
pub mod stats;
pub mod store;
pub mod worker;

pub use cli::Cli;
pub use config::RunConfig;
pub use coordinator::{RunCoordinator, RunOutcome};
pub use device::DeviceType;
pub use error::{LoadError, Result};
