//! Change detection and report signing for monitored account files.
//!
//! The pipeline is: [`Snapshot`] a file, [`extract`] its account names,
//! [`diff`] them against the previous snapshot, and when anything changed
//! wrap the diff in a [`Report`] signed with the process key by
//! [`AuditSigner`]. [`verify_report`] is the recipient-side check.

mod diff;
mod entity;
mod report;
mod signer;
mod snapshot;
mod verify;

pub use diff::{diff, EntityDiff, ADDED_PREFIX, REMOVED_PREFIX};
pub use entity::{extract, FIELD_DELIMITER, RECORD_DELIMITER};
pub use report::{format_timestamp, EventClock, Report, ReportBuilder, HASH_MARKER, SIGNED_MARKER, TIMESTAMP_FORMAT};
pub use signer::{sign, AuditSigner, Tag, TAG_LEN};
pub use snapshot::{Snapshot, SnapshotError, DIGEST_LEN};
pub use verify::{verify_report, VerifyError};

/// Re-export the key and zone types for convenience.
pub use chrono_tz::Tz;
pub use usrwatch_common_secret::SecretKey;
