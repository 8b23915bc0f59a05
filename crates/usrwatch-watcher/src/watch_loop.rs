//! The watch loop: events in, signed reports out.

use crate::event::{ChangeEvent, EventSource};
use crate::WatchError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use usrwatch_audit::{diff, EventClock, ReportBuilder, Snapshot};
use usrwatch_common_secret::SecretKey;
use usrwatch_notify::Notifier;

/// Default bound on a single delivery, on top of any transport timeout.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Waiting for the next event.
    Idle,
    /// Re-reading a file and running the pipeline.
    Processing,
    /// Event source exhausted; no further events are handled.
    Stopped,
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Not a monitored path, or not a write/create.
    Ignored,
    /// Re-read, but the account set is unchanged. Nothing sent.
    Unchanged,
    /// Report delivered.
    Reported { diff: String },
    /// Report built but delivery failed.
    ReportFailed { diff: String, reason: String },
}

/// Owns the process key and the retained snapshots, and drives the
/// snapshot/diff/report pipeline one event at a time.
///
/// Events are handled strictly in sequence, so each diff is taken against
/// the snapshot left by the previous event for the same path.
pub struct WatchLoop<N> {
    recipient: String,
    secret: SecretKey,
    notifier: N,
    snapshots: HashMap<PathBuf, Snapshot>,
    state: WatchState,
    delivery_timeout: Duration,
    clock: EventClock,
}

impl<N: Notifier> WatchLoop<N> {
    /// Create a loop with no monitored files yet.
    pub fn new(recipient: impl Into<String>, secret: SecretKey, notifier: N) -> Self {
        Self {
            recipient: recipient.into(),
            secret,
            notifier,
            snapshots: HashMap::new(),
            state: WatchState::Idle,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
            clock: EventClock::local(),
        }
    }

    /// Override the per-delivery bound.
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Stamp reports with `clock` instead of the host zone.
    pub fn with_clock(mut self, clock: EventClock) -> Self {
        self.clock = clock;
        self
    }

    /// Current state.
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Retained snapshot for `path`, if monitored.
    pub fn snapshot(&self, path: impl AsRef<Path>) -> Option<&Snapshot> {
        self.snapshots.get(path.as_ref())
    }

    /// Send the restart notice carrying the key in hex.
    ///
    /// This is the only time the key leaves the process. Failure is fatal:
    /// without it the recipient can never verify a report.
    pub async fn announce(&self) -> Result<(), WatchError> {
        let body = format!(
            "Program restarted, current hash string: {}",
            self.secret.reveal_hex()
        );
        self.notifier
            .send(&self.recipient, &body)
            .await
            .map_err(WatchError::Announce)?;
        info!(recipient = %self.recipient, "Startup announcement sent");
        Ok(())
    }

    /// Take the initial snapshot of a monitored file.
    pub async fn track(&mut self, path: impl AsRef<Path>) -> Result<(), WatchError> {
        let snapshot = Snapshot::capture(path.as_ref())
            .await
            .map_err(WatchError::InitialSnapshot)?;
        info!(
            path = %snapshot.path().display(),
            entities = snapshot.entities().len(),
            digest = %snapshot.digest_hex(),
            "Monitoring file"
        );
        self.snapshots.insert(snapshot.path().to_path_buf(), snapshot);
        Ok(())
    }

    /// Handle one change event.
    ///
    /// A read error leaves the retained snapshot untouched and is returned
    /// to the caller; otherwise the snapshot is replaced whether or not a
    /// report was sent.
    pub async fn handle_event(&mut self, event: ChangeEvent) -> Result<EventOutcome, WatchError> {
        if !event.kind.is_content_change() {
            return Ok(EventOutcome::Ignored);
        }
        let Some(previous) = self.snapshots.get(&event.path) else {
            return Ok(EventOutcome::Ignored);
        };

        self.state = WatchState::Processing;
        debug!(path = %event.path.display(), kind = ?event.kind, "Monitored file changed");

        let current = match Snapshot::capture(&event.path).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.state = WatchState::Idle;
                return Err(WatchError::Read(e));
            }
        };

        if previous.same_content(&current) {
            debug!(path = %event.path.display(), "Content digest unchanged");
        }

        let diff_text = diff(previous.entities(), current.entities());
        let outcome = if diff_text.is_empty() {
            EventOutcome::Unchanged
        } else {
            self.report(&event.path, diff_text).await
        };

        self.snapshots.insert(event.path, current);
        self.state = WatchState::Idle;
        Ok(outcome)
    }

    async fn report(&self, path: &Path, diff_text: String) -> EventOutcome {
        let event_time = self.clock.label_now();
        let report = ReportBuilder::build_labelled(&event_time, &diff_text, &self.secret);

        let sent = tokio::time::timeout(
            self.delivery_timeout,
            self.notifier.send(&self.recipient, report.as_str()),
        )
        .await;

        match sent {
            Ok(Ok(())) => {
                info!(path = %path.display(), report = %report, "Change report sent");
                EventOutcome::Reported { diff: diff_text }
            }
            Ok(Err(e)) => {
                error!(path = %path.display(), error = %e, "Failed to send change report");
                EventOutcome::ReportFailed {
                    diff: diff_text,
                    reason: e.to_string(),
                }
            }
            Err(_) => {
                error!(path = %path.display(), timeout = ?self.delivery_timeout, "Change report delivery timed out");
                EventOutcome::ReportFailed {
                    diff: diff_text,
                    reason: format!("delivery timed out after {:?}", self.delivery_timeout),
                }
            }
        }
    }

    /// Consume events until the source is exhausted.
    ///
    /// Per-event errors are logged and the loop continues.
    pub async fn run<S: EventSource>(&mut self, source: &mut S) {
        self.state = WatchState::Idle;

        while let Some(item) = source.next_event().await {
            match item {
                Ok(event) => match self.handle_event(event).await {
                    Ok(outcome) => debug!(?outcome, "Event handled"),
                    Err(e) => warn!(error = %e, "Skipping change event"),
                },
                Err(e) => warn!(error = %e, "Event source reported an error"),
            }
        }

        self.state = WatchState::Stopped;
        info!("Event source closed, watch loop stopped");
    }

    /// Mark the loop stopped, e.g. on an external shutdown signal.
    pub fn stop(&mut self) {
        self.state = WatchState::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ChangeKind;
    use std::sync::Arc;
    use usrwatch_audit::verify_report;
    use usrwatch_test_utils::{passwd_fixture, temp_file, RecordingNotifier};

    fn key() -> SecretKey {
        SecretKey::from_bytes([0x33; 64])
    }

    async fn loop_for(content: &str) -> (tempfile::TempDir, PathBuf, Arc<RecordingNotifier>, WatchLoop<Arc<RecordingNotifier>>) {
        let (dir, path) = temp_file(content);
        let notifier = Arc::new(RecordingNotifier::new());
        let mut watch = WatchLoop::new("admin@example.com", key(), notifier.clone());
        watch.track(&path).await.unwrap();
        (dir, path, notifier, watch)
    }

    #[tokio::test]
    async fn test_announce_carries_key_hex() {
        let notifier = Arc::new(RecordingNotifier::new());
        let watch = WatchLoop::new("admin@example.com", key(), notifier.clone());
        watch.announce().await.unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "admin@example.com");
        assert_eq!(
            sent[0].body,
            format!("Program restarted, current hash string: {}", "33".repeat(64))
        );
    }

    #[tokio::test]
    async fn test_announce_failure_is_fatal() {
        let notifier = Arc::new(RecordingNotifier::new());
        notifier.set_failing(true);
        let watch = WatchLoop::new("admin@example.com", key(), notifier);
        let err = watch.announce().await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_track_missing_file_is_fatal() {
        let mut watch = WatchLoop::new("admin@example.com", key(), RecordingNotifier::new());
        let err = watch.track("/nonexistent/usrwatch/passwd").await.unwrap_err();
        assert!(matches!(err, WatchError::InitialSnapshot(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_metadata_event_is_ignored() {
        let (_dir, path, notifier, mut watch) = loop_for(&passwd_fixture(&["root"])).await;
        std::fs::write(&path, passwd_fixture(&["root", "mallory"])).unwrap();

        let outcome = watch
            .handle_event(ChangeEvent::new(&path, ChangeKind::Metadata))
            .await
            .unwrap();

        assert_eq!(outcome, EventOutcome::Ignored);
        assert!(notifier.sent().is_empty());
        assert_eq!(watch.snapshot(&path).unwrap().entities(), ["root", ""]);
    }

    #[tokio::test]
    async fn test_send_failure_still_replaces_snapshot() {
        let (_dir, path, notifier, mut watch) = loop_for(&passwd_fixture(&["root"])).await;
        notifier.set_failing(true);
        std::fs::write(&path, passwd_fixture(&["root", "bob"])).unwrap();

        let outcome = watch
            .handle_event(ChangeEvent::new(&path, ChangeKind::Write))
            .await
            .unwrap();

        assert!(matches!(outcome, EventOutcome::ReportFailed { ref diff, .. } if diff == "Username added: bob\n"));
        assert_eq!(watch.snapshot(&path).unwrap().entities(), ["root", "bob", ""]);
        assert_eq!(watch.state(), WatchState::Idle);
    }

    #[tokio::test]
    async fn test_read_error_keeps_snapshot() {
        let (_dir, path, notifier, mut watch) = loop_for(&passwd_fixture(&["root"])).await;
        std::fs::remove_file(&path).unwrap();

        let err = watch
            .handle_event(ChangeEvent::new(&path, ChangeKind::Create))
            .await
            .unwrap_err();

        assert!(matches!(err, WatchError::Read(_)));
        assert!(!err.is_fatal());
        assert_eq!(watch.snapshot(&path).unwrap().entities(), ["root", ""]);
        assert!(notifier.sent().is_empty());
        assert_eq!(watch.state(), WatchState::Idle);
    }

    #[tokio::test]
    async fn test_sent_report_verifies_with_key() {
        let (_dir, path, notifier, mut watch) = loop_for(&passwd_fixture(&["root"])).await;
        std::fs::write(&path, passwd_fixture(&["root", "bob"])).unwrap();

        watch
            .handle_event(ChangeEvent::new(&path, ChangeKind::Write))
            .await
            .unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.starts_with("----SIGNED----\nEvent time: "));
        assert_eq!(verify_report(&sent[0].body, &key()), Ok(()));
    }

    #[tokio::test]
    async fn test_run_stops_when_source_closes() {
        let (_dir, _path, _notifier, mut watch) = loop_for(&passwd_fixture(&["root"])).await;
        let (tx, mut source) = crate::ChannelEventSource::new(4);
        tx.send(Err(WatchError::Source("queue overflow".into()))).await.unwrap();
        drop(tx);

        watch.run(&mut source).await;
        assert_eq!(watch.state(), WatchState::Stopped);
    }
}
