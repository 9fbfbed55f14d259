//! memc-load - installed-apps log loader

use clap::Parser;
use memc_common::logging::init_logging;
use memc_load::cli::{exit_status, Cli, EXIT_FATAL};
use memc_load::{selftest, RunCoordinator};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_config = match cli.log_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: invalid logging configuration: {:#}", e);
            return ExitCode::from(EXIT_FATAL);
        },
    };
    let _guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: cannot initialize logging: {:#}", e);
            return ExitCode::from(EXIT_FATAL);
        },
    };

    if cli.test {
        return match selftest::run() {
            Ok(checked) => {
                info!(samples = checked, "Self-test passed");
                ExitCode::SUCCESS
            },
            Err(e) => {
                error!(error = %e, "Self-test failed");
                ExitCode::from(EXIT_FATAL)
            },
        };
    }

    let config = cli.run_config();
    match config.summary() {
        Ok(options) => info!(options = %options, "Memc loader started"),
        Err(e) => warn!(error = %e, "Memc loader started, options not printable"),
    }

    let started = Instant::now();
    let result = RunCoordinator::new(config).run().await;
    info!("Processing took {:.3} seconds", started.elapsed().as_secs_f64());

    if let Err(ref e) = result {
        error!(error = %e, "Loader stopped");
    }
    ExitCode::from(exit_status(&result))
}
