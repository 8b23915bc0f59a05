//! Filesystem-backed event source.

use crate::event::{ChangeEvent, ChangeKind, EventSource};
use crate::WatchError;
use async_trait::async_trait;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Watches the parent directories of the monitored files.
///
/// Directories rather than files are watched so that editors and account
/// tools that replace the file by renaming a temporary copy onto it are
/// still seen.
pub struct FsEventSource {
    _watcher: notify::RecommendedWatcher,
    receiver: mpsc::Receiver<Result<ChangeEvent, WatchError>>,
}

impl FsEventSource {
    /// Start watching the directories containing `targets`.
    pub fn new(targets: &[PathBuf]) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel(256);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let items: Vec<Result<ChangeEvent, WatchError>> = match res {
                Ok(event) => classify_event(&event).into_iter().map(Ok).collect(),
                Err(e) => vec![Err(WatchError::Source(e.to_string()))],
            };
            for item in items {
                // The receiver is gone once the loop has stopped.
                let _ = tx.blocking_send(item);
            }
        })?;

        for dir in watch_dirs(targets) {
            watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            info!(dir = %dir.display(), "Watching directory");
        }

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }
}

#[async_trait]
impl EventSource for FsEventSource {
    async fn next_event(&mut self) -> Option<Result<ChangeEvent, WatchError>> {
        self.receiver.recv().await
    }
}

/// Distinct parent directories of `targets`.
fn watch_dirs(targets: &[PathBuf]) -> BTreeSet<PathBuf> {
    targets
        .iter()
        .filter_map(|t| t.parent())
        .map(Path::to_path_buf)
        .collect()
}

/// Map a notify event onto change events, one per affected path.
fn classify_event(event: &Event) -> Vec<ChangeEvent> {
    let kind = match &event.kind {
        EventKind::Create(_) => ChangeKind::Create,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            ChangeKind::Write
        }
        EventKind::Modify(ModifyKind::Metadata(_)) => ChangeKind::Metadata,
        // A rename onto a monitored path replaces its content.
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Create,
        // The paired From/To events are delivered separately.
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => return Vec::new(),
        EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Rename,
        EventKind::Remove(_) => ChangeKind::Remove,
        _ => ChangeKind::Other,
    };

    debug!(?event.kind, paths = ?event.paths, "Filesystem event");
    event
        .paths
        .iter()
        .map(|path| ChangeEvent::new(path.clone(), kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};
    use std::time::Duration;
    use tempfile::TempDir;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for p in paths {
            event = event.add_path(PathBuf::from(p));
        }
        event
    }

    #[test]
    fn test_classify_write_and_create() {
        let write = event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), &["/etc/passwd"]);
        assert_eq!(
            classify_event(&write),
            vec![ChangeEvent::new("/etc/passwd", ChangeKind::Write)]
        );

        let create = event(EventKind::Create(CreateKind::File), &["/etc/passwd"]);
        assert_eq!(
            classify_event(&create),
            vec![ChangeEvent::new("/etc/passwd", ChangeKind::Create)]
        );
    }

    #[test]
    fn test_classify_rename_onto_target_as_create() {
        let to = event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &["/etc/passwd"]);
        assert_eq!(classify_event(&to)[0].kind, ChangeKind::Create);

        let from = event(EventKind::Modify(ModifyKind::Name(RenameMode::From)), &["/etc/passwd+"]);
        assert_eq!(classify_event(&from)[0].kind, ChangeKind::Rename);

        let both = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/etc/passwd+", "/etc/passwd"],
        );
        assert!(classify_event(&both).is_empty());
    }

    #[test]
    fn test_classify_other_classes() {
        let meta = event(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)), &["/etc/passwd"]);
        assert_eq!(classify_event(&meta)[0].kind, ChangeKind::Metadata);

        let remove = event(EventKind::Remove(RemoveKind::File), &["/etc/passwd"]);
        assert_eq!(classify_event(&remove)[0].kind, ChangeKind::Remove);
    }

    #[test]
    fn test_watch_dirs_are_deduplicated() {
        let dirs = watch_dirs(&[
            PathBuf::from("/etc/passwd"),
            PathBuf::from("/etc/shadow"),
            PathBuf::from("/var/lib/extrausers/passwd"),
        ]);
        assert_eq!(
            dirs.into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("/etc"), PathBuf::from("/var/lib/extrausers")]
        );
    }

    #[test]
    fn test_missing_directory_is_setup_error() {
        let result = FsEventSource::new(&[PathBuf::from("/nonexistent/usrwatch/passwd")]);
        assert!(matches!(result, Err(WatchError::Setup(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_detects_write_to_target() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("passwd");
        std::fs::write(&target, "root:x:0:0\n").unwrap();

        let mut source = FsEventSource::new(&[target.clone()]).unwrap();

        // Give the watcher time to register.
        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::write(&target, "root:x:0:0\nbob:x:1:1\n").unwrap();

        let seen = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(item) = source.next_event().await {
                if let Ok(event) = item {
                    if event.path == target && event.kind.is_content_change() {
                        return true;
                    }
                }
            }
            false
        })
        .await
        .unwrap_or(false);

        assert!(seen);
    }
}
