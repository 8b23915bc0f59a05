//! Configuration file loading and parsing.

use crate::env::vars;
use crate::types::WatchConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// System-wide configuration file, used when nothing else is specified.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/usrwatch/config.yaml";

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },

    #[error("missing required setting: {name}")]
    MissingSetting { name: &'static str },
}

/// Configuration loader.
pub struct ConfigLoader {
    path: PathBuf,
    required: bool,
}

impl ConfigLoader {
    /// Create a loader for an explicitly requested file. A missing file is an error.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required: true,
        }
    }

    /// Locate the configuration file: `USRWATCH_CONFIG` first, then the
    /// system path. A missing system file falls back to defaults.
    pub fn discover() -> Self {
        match std::env::var(vars::USRWATCH_CONFIG) {
            Ok(path) => Self::new(path),
            Err(_) => Self {
                path: PathBuf::from(SYSTEM_CONFIG_PATH),
                required: false,
            },
        }
    }

    /// Path this loader reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and validate the configuration file.
    pub fn load(&self) -> Result<WatchConfig, ConfigError> {
        if !self.path.exists() {
            if self.required {
                return Err(ConfigError::NotFound {
                    path: self.path.clone(),
                });
            }
            return Ok(WatchConfig::default());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let config = Self::parse(&contents)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Parse YAML text after environment expansion.
    pub fn parse(contents: &str) -> Result<WatchConfig, ConfigError> {
        let expanded = Self::expand_env_vars(contents)?;
        serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })
    }

    /// Expand environment variables in the form `${VAR}` or `${VAR:-default}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = regex::Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").map_err(|e| {
            ConfigError::ValidationError {
                message: e.to_string(),
            }
        })?;

        for cap in re.captures_iter(content) {
            let full_match = &cap[0];
            let var_name = &cap[1];
            let default = cap.get(2).map(|m| m.as_str());

            let value = match std::env::var(var_name) {
                Ok(v) => v,
                Err(_) => match default {
                    Some(d) => d.to_string(),
                    None => {
                        return Err(ConfigError::EnvVarNotFound {
                            var: var_name.to_string(),
                        })
                    }
                },
            };

            result = result.replace(full_match, &value);
        }

        Ok(result)
    }

    /// Validate configuration values.
    ///
    /// Recipient and relay host may still be absent here; they can be
    /// supplied on the command line. See [`WatchConfig::delivery`].
    pub fn validate(config: &WatchConfig) -> Result<(), ConfigError> {
        if config.targets.paths.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "targets.paths must name at least one file".to_string(),
            });
        }

        if let Some(path) = config.targets.paths.iter().find(|p| !p.is_absolute()) {
            return Err(ConfigError::ValidationError {
                message: format!("target path must be absolute: {}", path.display()),
            });
        }

        if config.targets.paths.iter().any(|p| p.file_name().is_none()) {
            return Err(ConfigError::ValidationError {
                message: "target path must name a file".to_string(),
            });
        }

        if config.relay.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "relay.port must be greater than 0".to_string(),
            });
        }

        if config.relay.connect_timeout_secs == 0 || config.relay.send_timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "relay timeouts must be greater than 0".to_string(),
            });
        }

        if let Some(recipient) = &config.recipient {
            if !recipient.contains('@') {
                return Err(ConfigError::ValidationError {
                    message: format!("recipient is not a mail address: {recipient}"),
                });
            }
        }

        Ok(())
    }
}

impl WatchConfig {
    /// Recipient and relay host, both of which are mandatory for running.
    pub fn delivery(&self) -> Result<(&str, &str), ConfigError> {
        let recipient = self
            .recipient
            .as_deref()
            .ok_or(ConfigError::MissingSetting { name: "recipient" })?;
        let host = self
            .relay
            .host
            .as_deref()
            .ok_or(ConfigError::MissingSetting { name: "relay.host" })?;
        Ok((recipient, host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_SMTP_PORT;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempdir().unwrap();
        let loader = ConfigLoader::new(dir.path().join("absent.yaml"));
        assert!(matches!(loader.load(), Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_load_config_from_yaml_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let config_content = r#"
recipient: admin@example.com
relay:
  host: mail.example.com
  helo_name: sentinel.example.com
targets:
  paths:
    - /etc/passwd
    - /etc/shadow
"#;
        fs::write(&path, config_content).unwrap();

        let config = ConfigLoader::new(&path).load().unwrap();
        assert_eq!(config.recipient.as_deref(), Some("admin@example.com"));
        assert_eq!(config.relay.host.as_deref(), Some("mail.example.com"));
        assert_eq!(config.relay.helo_name, "sentinel.example.com");
        assert_eq!(config.targets.paths.len(), 2);

        // Unspecified values use defaults
        assert_eq!(config.relay.port, DEFAULT_SMTP_PORT);
        assert_eq!(config.mail.subject, "usrwatch");
    }

    #[test]
    fn test_env_var_default() {
        let result = ConfigLoader::expand_env_vars("key: ${USRWATCH_NONEXISTENT:-fallback}").unwrap();
        assert_eq!(result, "key: fallback");
    }

    #[test]
    fn test_env_var_missing_error() {
        let result = ConfigLoader::expand_env_vars("key: ${USRWATCH_MISSING_VAR}");
        match result {
            Err(ConfigError::EnvVarNotFound { var }) => assert_eq!(var, "USRWATCH_MISSING_VAR"),
            other => panic!("Expected EnvVarNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_env_var_expansion_in_config() {
        std::env::set_var("USRWATCH_TEST_RELAY", "relay.internal");

        let config = ConfigLoader::parse(
            r#"
relay:
  host: ${USRWATCH_TEST_RELAY}
  port: ${USRWATCH_TEST_PORT:-2525}
"#,
        )
        .unwrap();

        assert_eq!(config.relay.host.as_deref(), Some("relay.internal"));
        assert_eq!(config.relay.port, 2525);

        std::env::remove_var("USRWATCH_TEST_RELAY");
    }

    #[test]
    fn test_validation_errors() {
        let mut config = WatchConfig::default();
        config.targets.paths.clear();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ValidationError { message }) if message.contains("targets.paths")
        ));

        let mut config = WatchConfig::default();
        config.targets.paths = vec!["etc/passwd".into()];
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ValidationError { message }) if message.contains("absolute")
        ));

        let mut config = WatchConfig::default();
        config.relay.port = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ValidationError { message }) if message.contains("relay.port")
        ));

        let mut config = WatchConfig::default();
        config.recipient = Some("not-an-address".to_string());
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ValidationError { message }) if message.contains("recipient")
        ));

        assert!(ConfigLoader::validate(&WatchConfig::default()).is_ok());
    }

    #[test]
    fn test_parse_error_with_line_number() {
        let bad_yaml = r#"
relay:
  host: mail
  port: [unclosed
"#;
        match ConfigLoader::parse(bad_yaml) {
            Err(ConfigError::ParseError { line, .. }) => assert!(line.is_some()),
            other => panic!("Expected ParseError with line number, got {:?}", other),
        }
    }

    #[test]
    fn test_delivery_requires_recipient_and_host() {
        let mut config = WatchConfig::default();
        assert!(matches!(
            config.delivery(),
            Err(ConfigError::MissingSetting { name: "recipient" })
        ));

        config.recipient = Some("admin@example.com".to_string());
        assert!(matches!(
            config.delivery(),
            Err(ConfigError::MissingSetting { name: "relay.host" })
        ));

        config.relay.host = Some("mail.example.com".to_string());
        assert_eq!(
            config.delivery().unwrap(),
            ("admin@example.com", "mail.example.com")
        );
    }
}
