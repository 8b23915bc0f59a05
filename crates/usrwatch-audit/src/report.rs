//! Signed, timestamped change reports.
//!
//! A report is line oriented and framed by literal markers:
//!
//! ```text
//! ----SIGNED----
//! Event time: 19.10.2026 14:03:11 CEST
//! Username added: bob
//!
//! ----SIGNED----
//! ----HASH----
//! <128 lowercase hex characters>
//! ----HASH----
//! ```
//!
//! The tag covers everything from the first `----SIGNED----` through the
//! newline after the second one.

use crate::signer::{AuditSigner, Tag};
use chrono::{DateTime, Local, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt;
use tracing::debug;
use usrwatch_common_secret::SecretKey;

/// Marker framing the signed block.
pub const SIGNED_MARKER: &str = "----SIGNED----";

/// Marker framing the tag block.
pub const HASH_MARKER: &str = "----HASH----";

/// Timestamp layout: `DD.MM.YYYY HH:MM:SS TZ`.
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S %Z";

/// Render `now` for the `Event time:` line.
///
/// The zone label is whatever the offset type prints: the abbreviation
/// (`CEST`, `UTC`) for [`chrono_tz::Tz`] and [`chrono::Utc`], `+02:00` style
/// for [`chrono::Local`] and fixed offsets.
pub fn format_timestamp<Z>(now: &DateTime<Z>) -> String
where
    Z: TimeZone,
    Z::Offset: fmt::Display,
{
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// Source of `Event time:` labels.
///
/// Holds the named zone reports are stamped in. Without one the local
/// numeric offset is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventClock {
    zone: Option<Tz>,
}

impl EventClock {
    /// Clock for the host zone: `TZ` if it names an IANA zone, otherwise
    /// the system setting.
    pub fn local() -> Self {
        let from_env = std::env::var("TZ")
            .ok()
            .and_then(|v| v.trim_start_matches(':').parse::<Tz>().ok());
        let zone = from_env.or_else(|| {
            iana_time_zone::get_timezone()
                .ok()
                .and_then(|name| name.parse::<Tz>().ok())
        });
        if zone.is_none() {
            debug!("Local time zone not resolved, labelling with numeric offset");
        }
        Self { zone }
    }

    /// Clock pinned to `zone`.
    pub fn in_zone(zone: Tz) -> Self {
        Self { zone: Some(zone) }
    }

    /// Clock that always labels with the local numeric offset.
    pub fn offset_only() -> Self {
        Self { zone: None }
    }

    /// Zone in use, if resolved.
    pub fn zone(&self) -> Option<Tz> {
        self.zone
    }

    /// Label for the instant `at`.
    pub fn label(&self, at: DateTime<Utc>) -> String {
        match self.zone {
            Some(tz) => format_timestamp(&at.with_timezone(&tz)),
            None => format_timestamp(&at.with_timezone(&Local)),
        }
    }

    /// Label for the current instant.
    pub fn label_now(&self) -> String {
        self.label(Utc::now())
    }
}

/// A finished report, ready to hand to a notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    text: String,
    body_len: usize,
    tag: Tag,
}

impl Report {
    /// Full report text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The signed block, markers included.
    pub fn body(&self) -> &str {
        &self.text[..self.body_len]
    }

    /// Tag over [`Report::body`].
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Consume the report into its text.
    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Assembles reports from a timestamp, diff text and the process key.
pub struct ReportBuilder;

impl ReportBuilder {
    /// Build the signed report.
    pub fn build<Z>(now: &DateTime<Z>, diff_text: &str, secret: &SecretKey) -> Report
    where
        Z: TimeZone,
        Z::Offset: fmt::Display,
    {
        Self::build_labelled(&format_timestamp(now), diff_text, secret)
    }

    /// Build the signed report with an already rendered event time.
    pub fn build_labelled(event_time: &str, diff_text: &str, secret: &SecretKey) -> Report {
        let mut text = String::with_capacity(diff_text.len() + 256);
        text.push_str(SIGNED_MARKER);
        text.push('\n');
        text.push_str("Event time: ");
        text.push_str(event_time);
        text.push('\n');
        text.push_str(diff_text);
        text.push('\n');
        text.push_str(SIGNED_MARKER);
        text.push('\n');

        let body_len = text.len();
        let tag = AuditSigner::new(secret).sign(&text);

        text.push_str(HASH_MARKER);
        text.push('\n');
        text.push_str(&tag.to_hex());
        text.push('\n');
        text.push_str(HASH_MARKER);
        text.push('\n');

        Report {
            text,
            body_len,
            tag,
        }
    }
}
