//! Command-line interface
//!
//! Every option can also come from the environment (or a `.env` file loaded
//! by the binary), e.g. `MEMC_LOAD_PATTERN` or `MEMC_LOAD_GAID`.

use clap::Parser;
use memc_common::logging::{LogConfig, LogLevel};
use std::path::PathBuf;

use crate::config::{default_endpoint, RunConfig, DEFAULT_PATTERN};
use crate::coordinator::RunOutcome;
use crate::device::{DeviceMap, DeviceType};
use crate::error::Result;

/// Ingestion aborted: unknown device type, unreadable input, bad config
pub const EXIT_FATAL: u8 = 1;

/// The run finished but its error rate was too high
pub const EXIT_HIGH_ERROR_RATE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "memc-load")]
#[command(author, version, about = "Load installed-apps logs into memcached")]
pub struct Cli {
    /// Run the payload codec self-test and exit
    #[arg(short = 't', long = "test")]
    pub test: bool,

    /// Log file (stdout when omitted)
    #[arg(short = 'l', long = "log", env = "MEMC_LOAD_LOG")]
    pub log: Option<PathBuf>,

    /// Parse input and log payloads without writing to memcached
    #[arg(long)]
    pub dry: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Glob selecting the input files
    #[arg(long, env = "MEMC_LOAD_PATTERN", default_value = DEFAULT_PATTERN)]
    pub pattern: String,

    /// memcached address for idfa records
    #[arg(long, env = "MEMC_LOAD_IDFA", default_value = default_endpoint(DeviceType::Idfa))]
    pub idfa: String,

    /// memcached address for gaid records
    #[arg(long, env = "MEMC_LOAD_GAID", default_value = default_endpoint(DeviceType::Gaid))]
    pub gaid: String,

    /// memcached address for adid records
    #[arg(long, env = "MEMC_LOAD_ADID", default_value = default_endpoint(DeviceType::Adid))]
    pub adid: String,

    /// memcached address for dvid records
    #[arg(long, env = "MEMC_LOAD_DVID", default_value = default_endpoint(DeviceType::Dvid))]
    pub dvid: String,
}

impl Cli {
    fn endpoint(&self, device: DeviceType) -> &str {
        match device {
            DeviceType::Idfa => &self.idfa,
            DeviceType::Gaid => &self.gaid,
            DeviceType::Adid => &self.adid,
            DeviceType::Dvid => &self.dvid,
        }
    }

    /// Run configuration described by the parsed options
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            pattern: self.pattern.clone(),
            endpoints: DeviceMap::from_fn(|device| self.endpoint(device).to_string()),
            dry_run: self.dry,
            ..RunConfig::default()
        }
    }

    /// Logging configuration; `LOG_*` environment variables take precedence
    pub fn log_config(&self) -> anyhow::Result<LogConfig> {
        let level = if self.dry || self.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        };

        let mut builder = LogConfig::builder().level(level);
        if let Some(ref path) = self.log {
            builder = builder.log_file(path);
        }

        builder.build().merge_env()
    }
}

/// Process exit status for the result of a run
pub fn exit_status(result: &Result<RunOutcome>) -> u8 {
    match result {
        Ok(outcome) if outcome.is_rejected() => EXIT_HIGH_ERROR_RATE,
        Ok(_) => 0,
        Err(_) => EXIT_FATAL,
    }
}
