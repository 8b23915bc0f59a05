//! Point-in-time capture of a monitored file.

use crate::entity::extract;
use sha2::{Digest, Sha512};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Content digest length in bytes (SHA-512 output).
pub const DIGEST_LEN: usize = 64;

/// Snapshot errors.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Content, digest and entity list of one monitored file.
///
/// Snapshots are immutable. The entity list is always derived from the raw
/// content at construction, so the two cannot drift apart; a changed file
/// gets a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    path: PathBuf,
    digest: [u8; DIGEST_LEN],
    raw_content: Vec<u8>,
    entities: Vec<String>,
}

impl Snapshot {
    /// Build a snapshot from content already in memory.
    pub fn from_bytes(path: impl Into<PathBuf>, raw_content: Vec<u8>) -> Self {
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&Sha512::digest(&raw_content));
        let entities = extract(&raw_content);

        Self {
            path: path.into(),
            digest,
            raw_content,
            entities,
        }
    }

    /// Read the file at `path` and snapshot it.
    pub async fn capture(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let raw_content = tokio::fs::read(path)
            .await
            .map_err(|source| SnapshotError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let snapshot = Self::from_bytes(path, raw_content);
        debug!(
            path = %path.display(),
            bytes = snapshot.raw_content.len(),
            entities = snapshot.entities.len(),
            "Captured snapshot"
        );
        Ok(snapshot)
    }

    /// Monitored file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// SHA-512 over the full content.
    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    /// Lowercase hex digest.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Content as last read.
    pub fn raw_content(&self) -> &[u8] {
        &self.raw_content
    }

    /// Entities in order of appearance.
    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    /// True when both snapshots hold byte-identical content.
    pub fn same_content(&self, other: &Snapshot) -> bool {
        self.digest == other.digest
    }
}
