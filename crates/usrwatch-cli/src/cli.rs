//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use usrwatch_common_config::{vars, ConfigError, Environment, WatchConfig};

/// usrwatch - account database integrity monitor
///
/// Watches the system account database and mails a signed report to the
/// administrator whenever an account is added or removed.
#[derive(Debug, Parser)]
#[command(
    name = "usrwatch",
    author,
    version,
    about,
    long_about = None,
    help_template = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
"
)]
pub struct Cli {
    /// Increase verbosity level (-v, -vv)
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase verbosity level"
    )]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(
        short,
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Suppress non-error output"
    )]
    pub quiet: bool,

    #[command(flatten)]
    pub watch: WatchArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Arguments for watching (the default mode).
#[derive(Debug, Default, Args)]
pub struct WatchArgs {
    /// Mail address that receives the announcement and all reports
    #[arg(value_name = "RECIPIENT")]
    pub recipient: Option<String>,

    /// Mail relay host
    #[arg(value_name = "RELAY_HOST")]
    pub relay: Option<String>,

    /// Mail relay port
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Path to configuration file
    #[arg(
        short,
        long,
        value_hint = ValueHint::FilePath,
        help = "Path to configuration file [env: USRWATCH_CONFIG]"
    )]
    pub config: Option<PathBuf>,

    /// File to monitor instead of the configured targets (repeatable)
    #[arg(long = "target", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub targets: Vec<PathBuf>,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check the signature of a received report
    Verify(VerifyArgs),
}

/// Arguments for `usrwatch verify`.
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Key from the startup announcement, as hex
    #[arg(long, env = "USRWATCH_KEY", hide_env_values = true, value_name = "HEX")]
    pub key: String,

    /// Report or full mail message; `-` reads stdin
    #[arg(value_name = "FILE", default_value = "-", value_hint = ValueHint::FilePath)]
    pub input: PathBuf,
}

impl WatchArgs {
    /// Merge command line and environment overrides into `config`.
    ///
    /// Command line values win over environment variables, which win over
    /// the configuration file.
    pub fn apply(&self, config: &mut WatchConfig) -> Result<(), ConfigError> {
        if let Some(recipient) = self
            .recipient
            .clone()
            .or_else(|| Environment::get(vars::USRWATCH_RECIPIENT))
        {
            config.recipient = Some(recipient);
        }

        if let Some(host) = self
            .relay
            .clone()
            .or_else(|| Environment::get(vars::USRWATCH_RELAY))
        {
            config.relay.host = Some(host);
        }

        let env_port = Environment::get_int::<u16>(vars::USRWATCH_RELAY_PORT).map_err(|e| {
            ConfigError::ValidationError {
                message: e.to_string(),
            }
        })?;
        if let Some(port) = self.port.or(env_port) {
            config.relay.port = port;
        }

        if !self.targets.is_empty() {
            config.targets.paths = self.targets.clone();
        }

        Ok(())
    }
}
