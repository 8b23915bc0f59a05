//! usrwatch - account database integrity monitor
//!
//! Main entry point for the `usrwatch` binary.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use usrwatch_common_config::Environment;
use usrwatch_common_log::LogConfig;

mod cli;
mod commands;
mod error;

use cli::{Cli, Command};
use error::CliError;

/// Application exit codes
#[repr(u8)]
pub enum Exit {
    Success = 0,
    GeneralError = 1,
    ConfigError = 2,
    Interrupted = 130,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit as u8)
    }
}

fn main() -> ExitCode {
    // Load .env before anything reads the environment
    let _env = Environment::init();

    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli) {
        eprintln!("error: {e}");
        return Exit::ConfigError.into();
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create Tokio runtime: {e}");
            return Exit::GeneralError.into();
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(exit) => exit.into(),
        Err(e) => {
            error!("{e}");
            if let Some(hint) = e.hint() {
                error!("hint: {hint}");
            }
            e.exit_code()
        }
    }
}

async fn run(cli: Cli) -> Result<Exit, CliError> {
    match &cli.command {
        Some(Command::Verify(args)) => {
            args.execute().await?;
            Ok(Exit::Success)
        }
        None => cli.watch.execute().await,
    }
}

fn init_tracing(cli: &Cli) -> Result<(), CliError> {
    let mut config = LogConfig::from_env();
    config.level = config.level.adjusted(cli.verbose, cli.quiet);
    usrwatch_common_log::init(config)?;
    Ok(())
}
