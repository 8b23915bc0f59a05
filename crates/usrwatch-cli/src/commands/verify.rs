//! Verify command implementation.

use std::path::Path;

use tokio::io::AsyncReadExt;
use tracing::debug;
use usrwatch_audit::verify_report;
use usrwatch_common_secret::SecretKey;

use crate::cli::VerifyArgs;
use crate::error::CliError;

impl VerifyArgs {
    pub async fn execute(&self) -> Result<(), CliError> {
        let key = SecretKey::from_hex(&self.key)?;
        let text = read_input(&self.input).await?;
        debug!(bytes = text.len(), "Verifying report");

        verify_report(&text, &key)?;
        println!("Report signature OK");
        Ok(())
    }
}

async fn read_input(path: &Path) -> Result<String, CliError> {
    let bytes = if path == Path::new("-") {
        let mut buf = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut buf)
            .await
            .map_err(|e| CliError::io("failed to read report from stdin", e))?;
        buf
    } else {
        tokio::fs::read(path)
            .await
            .map_err(|e| CliError::io(format!("failed to read report {}", path.display()), e))?
    };

    // Reports are ASCII; surrounding mail content may not be valid UTF-8.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
