//! Report delivery for usrwatch.
//!
//! The watcher only knows the [`Notifier`] trait. [`SmtpNotifier`] is the
//! production implementation, speaking plain SMTP to a configured relay.

mod message;
mod smtp;

pub use message::MailMessage;
pub use smtp::{SmtpConfig, SmtpNotifier};

use async_trait::async_trait;
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("relay I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("delivery timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("relay rejected {stage} with {code}: {message}")]
    Rejected {
        stage: &'static str,
        code: u16,
        message: String,
    },

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Sends a message body to a recipient.
///
/// A failed send is final for that message; callers decide whether the
/// failure is fatal.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `body` to `recipient`.
    async fn send(&self, recipient: &str, body: &str) -> Result<(), NotifyError>;
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    async fn send(&self, recipient: &str, body: &str) -> Result<(), NotifyError> {
        (**self).send(recipient, body).await
    }
}
