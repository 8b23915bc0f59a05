//! Watch loop errors.

use usrwatch_audit::SnapshotError;
use usrwatch_notify::NotifyError;

/// Errors raised while setting up or running the watch loop.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to set up file watching: {0}")]
    Setup(#[from] notify::Error),

    #[error("failed to send startup announcement: {0}")]
    Announce(#[source] NotifyError),

    #[error("failed to snapshot monitored file: {0}")]
    InitialSnapshot(#[source] SnapshotError),

    #[error("failed to re-read monitored file: {0}")]
    Read(#[source] SnapshotError),

    #[error("event source error: {0}")]
    Source(String),
}

impl WatchError {
    /// Setup failures end the process; everything else is logged and absorbed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WatchError::Setup(_) | WatchError::Announce(_) | WatchError::InitialSnapshot(_)
        )
    }
}
