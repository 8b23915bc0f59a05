//! Configuration types for usrwatch.
//!
//! Settings come from `/etc/usrwatch/config.yaml` (or the file named by
//! `USRWATCH_CONFIG`), with `${VAR}` expansion, and may be overridden on the
//! command line.

pub mod env;
pub mod loader;
pub mod types;

pub use env::*;
pub use loader::*;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_has_sensible_values() {
        let config = WatchConfig::default();

        assert!(config.recipient.is_none());
        assert!(config.relay.host.is_none());
        assert_eq!(config.relay.port, 25);
        assert_eq!(config.relay.helo_name, "localhost");
        assert_eq!(config.relay.connect_timeout_secs, 10);
        assert_eq!(config.relay.send_timeout_secs, 30);
        assert_eq!(config.mail.from, "usrwatch");
        assert_eq!(config.targets.paths, vec![PathBuf::from("/etc/passwd")]);
    }

    #[test]
    fn test_config_serializes_to_yaml() {
        let config = WatchConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();

        assert!(yaml.contains("relay:"));
        assert!(yaml.contains("mail:"));
        assert!(yaml.contains("targets:"));
        assert!(yaml.contains("port: 25"));
        assert!(yaml.contains("/etc/passwd"));
    }

    #[test]
    fn test_partial_configs_merge_with_defaults() {
        let partial_yaml = r#"
relay:
  port: 587
"#;

        let config: WatchConfig = serde_yaml::from_str(partial_yaml).unwrap();

        assert_eq!(config.relay.port, 587);
        assert_eq!(config.relay.helo_name, "localhost");
        assert_eq!(config.targets, TargetsConfig::default());
    }
}
