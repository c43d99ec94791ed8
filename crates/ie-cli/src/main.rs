//! ie - project and group import/export
//!
//! # Examples
//!
//! ```bash
//! # Export project 42 into ./exports
//! ie export --root-id 42 --output exports --pretty
//!
//! # Import it into project 7 as alice, forcing private visibility
//! ie import exports/my-project.tar.gz --target-id 7 --user alice --set visibility_level=0
//! ```

use ie_cli::{Cli, CliError, execute, logger};
use ie_config::Config;

use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Starting ie v{}", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    let pretty = cli.pretty;
    match execute(cli, &config, cancel).await {
        Ok(outcome) => {
            let output = if pretty {
                serde_json::to_string_pretty(&outcome.output)
            } else {
                serde_json::to_string(&outcome.output)
            };

            match output {
                Ok(json) => {
                    println!("{}", json);
                    if outcome.success {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::FAILURE
                    }
                }
                Err(e) => {
                    eprintln!("Error serializing report: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load and validate config, then bring up the logger it describes.
fn load_config() -> Result<Config, CliError> {
    let config = Config::load()?;
    config.validate()?;

    let log_file = match config.logging.file_in(&Config::config_dir()?) {
        Some((file, dir)) => {
            std::fs::create_dir_all(&dir).map_err(|e| CliError::Io {
                path: dir.clone(),
                source: e,
            })?;
            Some(file)
        }
        None => None,
    };

    logger::initialize(config.logging.level, log_file, config.logging.colored)?;
    Ok(config)
}
