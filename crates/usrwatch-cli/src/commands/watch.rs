//! Watch command: announce the key, then report account changes until
//! interrupted.

use tracing::{debug, info};
use usrwatch_common_config::{ConfigLoader, WatchConfig};
use usrwatch_common_secret::SecretKey;
use usrwatch_notify::{SmtpConfig, SmtpNotifier};
use usrwatch_watcher::{FsEventSource, WatchLoop};

use crate::cli::WatchArgs;
use crate::error::CliError;
use crate::Exit;

impl WatchArgs {
    pub async fn execute(&self) -> Result<Exit, CliError> {
        let loader = match &self.config {
            Some(path) => ConfigLoader::new(path),
            None => ConfigLoader::discover(),
        };
        let mut config = loader.load()?;
        debug!(path = %loader.path().display(), "Configuration loaded");

        self.apply(&mut config)?;
        ConfigLoader::validate(&config)?;
        let (recipient, host) = config.delivery()?;

        let notifier = SmtpNotifier::new(smtp_config(&config, host));
        let secret = SecretKey::generate()?;
        let mut watch = WatchLoop::new(recipient, secret, notifier);

        watch.announce().await?;
        // Watches go in before the initial snapshots so no write between
        // the two is missed.
        let mut source = FsEventSource::new(&config.targets.paths)?;
        for target in &config.targets.paths {
            watch.track(target).await?;
        }

        info!(
            recipient,
            relay = %format!("{}:{}", host, config.relay.port),
            targets = config.targets.paths.len(),
            "Watching for account changes"
        );

        let exit = tokio::select! {
            _ = watch.run(&mut source) => Exit::Success,
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|e| CliError::io("failed to listen for Ctrl-C", e))?;
                info!("Interrupted, shutting down");
                Exit::Interrupted
            }
        };
        watch.stop();

        Ok(exit)
    }
}

/// SMTP settings for `host` from the merged configuration.
pub fn smtp_config(config: &WatchConfig, host: &str) -> SmtpConfig {
    SmtpConfig {
        host: host.to_string(),
        port: config.relay.port,
        helo_name: config.relay.helo_name.clone(),
        from: config.mail.from.clone(),
        subject: config.mail.subject.clone(),
        connect_timeout: config.relay.connect_timeout(),
        send_timeout: config.relay.send_timeout(),
    }
}
