//! Change events and their sources.

use crate::WatchError;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Operation class of a filesystem change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Content written in place.
    Write,
    /// File created, or another file renamed onto this path.
    Create,
    /// File removed.
    Remove,
    /// File renamed away from this path.
    Rename,
    /// Permissions, ownership or timestamps changed.
    Metadata,
    /// Anything else (access, unknown).
    Other,
}

impl ChangeKind {
    /// Write and create are the only classes that trigger a re-read.
    pub fn is_content_change(self) -> bool {
        matches!(self, ChangeKind::Write | ChangeKind::Create)
    }
}

/// One discrete "path changed" notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Changed path.
    pub path: PathBuf,
    /// What happened to it.
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Supplier of change events.
///
/// `None` means the source is exhausted and the watch loop should stop.
/// `Some(Err(_))` reports a steady-state error; the loop logs it and keeps
/// waiting.
#[async_trait]
pub trait EventSource: Send {
    async fn next_event(&mut self) -> Option<Result<ChangeEvent, WatchError>>;
}

/// Event source fed through a channel.
pub struct ChannelEventSource {
    receiver: mpsc::Receiver<Result<ChangeEvent, WatchError>>,
}

impl ChannelEventSource {
    /// Create a source and the sender that feeds it.
    pub fn new(buffer: usize) -> (mpsc::Sender<Result<ChangeEvent, WatchError>>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { receiver: rx })
    }
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn next_event(&mut self) -> Option<Result<ChangeEvent, WatchError>> {
        self.receiver.recv().await
    }
}
