//! CLI error handling.

use std::io;
use std::process::ExitCode;

use thiserror::Error;
use usrwatch_audit::VerifyError;
use usrwatch_common_config::ConfigError;
use usrwatch_common_log::LogError;
use usrwatch_common_secret::SecretError;
use usrwatch_watcher::WatchError;

/// CLI error type with context
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        hint: Option<String>,
    },

    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: io::Error,
    },

    #[error("{message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{message}")]
    Validation { message: String },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        let code = match self {
            Self::Config { .. } => 2,
            Self::Io { .. } => 3,
            Self::Network { .. } => 4,
            Self::Validation { .. } => 5,
            Self::Other(_) => 1,
        };
        ExitCode::from(code)
    }

    /// Get hint for this error if available
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Config { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }

    /// Create an I/O error
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::MissingSetting { name: "recipient" } => Some(
                "pass RECIPIENT as the first argument, set USRWATCH_RECIPIENT, or set `recipient` in the config file",
            ),
            ConfigError::MissingSetting { .. } => Some(
                "pass RELAY_HOST as the second argument, set USRWATCH_RELAY, or set `relay.host` in the config file",
            ),
            ConfigError::NotFound { .. } => Some("check --config or USRWATCH_CONFIG"),
            _ => None,
        };
        Self::Config {
            message: err.to_string(),
            source: Some(Box::new(err)),
            hint: hint.map(str::to_string),
        }
    }
}

impl From<LogError> for CliError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::FileError(source) => Self::io("failed to open log file", source),
            other => Self::Config {
                message: other.to_string(),
                source: None,
                hint: None,
            },
        }
    }
}

impl From<SecretError> for CliError {
    fn from(err: SecretError) -> Self {
        match err {
            SecretError::Entropy(_) => Self::Other(anyhow::Error::new(err).context("cannot generate signing key")),
            other => Self::Validation {
                message: format!("invalid key: {other}"),
            },
        }
    }
}

impl From<VerifyError> for CliError {
    fn from(err: VerifyError) -> Self {
        Self::Validation {
            message: format!("report verification failed: {err}"),
        }
    }
}

impl From<WatchError> for CliError {
    fn from(err: WatchError) -> Self {
        let message = err.to_string();
        match err {
            WatchError::Announce(source) => Self::Network {
                message,
                source: Some(Box::new(source)),
            },
            WatchError::InitialSnapshot(source) | WatchError::Read(source) => {
                Self::io(message, io::Error::new(io::ErrorKind::Other, source))
            }
            WatchError::Setup(source) => Self::io(message, io::Error::new(io::ErrorKind::Other, source)),
            WatchError::Source(_) => Self::Other(anyhow::anyhow!(message)),
        }
    }
}
