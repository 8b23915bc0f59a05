//! Configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default SMTP port for the mail relay.
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Default monitored account database.
pub const DEFAULT_TARGET: &str = "/etc/passwd";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatchConfig {
    /// Address that receives the startup announcement and every report.
    pub recipient: Option<String>,
    /// Mail relay settings.
    pub relay: RelayConfig,
    /// Message framing settings.
    pub mail: MailConfig,
    /// Monitored files.
    pub targets: TargetsConfig,
}

/// Mail relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    /// Relay host name or address.
    pub host: Option<String>,
    /// Relay port.
    pub port: u16,
    /// Name announced in EHLO/HELO.
    pub helo_name: String,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Upper bound for one whole SMTP dialog, in seconds.
    pub send_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_SMTP_PORT,
            helo_name: "localhost".to_string(),
            connect_timeout_secs: 10,
            send_timeout_secs: 30,
        }
    }
}

impl RelayConfig {
    /// Connect timeout as a `Duration`.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Send timeout as a `Duration`.
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

/// Message framing configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MailConfig {
    /// `From` header.
    pub from: String,
    /// `Subject` header.
    pub subject: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: "usrwatch".to_string(),
            subject: "usrwatch".to_string(),
        }
    }
}

/// Monitored file set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TargetsConfig {
    /// Absolute paths of monitored files.
    pub paths: Vec<PathBuf>,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from(DEFAULT_TARGET)],
        }
    }
}
