//! Change detection for monitored account files.
//!
//! This crate turns filesystem notifications into signed change reports:
//! - [`FsEventSource`] watches the directories holding the monitored files
//! - [`WatchLoop`] re-snapshots a file on write/create, diffs the account
//!   names and mails a signed report when the set changed
//! - [`ChannelEventSource`] feeds the loop from a channel, for tests and
//!   embedding

mod error;
mod event;
mod fs_source;
mod watch_loop;

pub use error::WatchError;
pub use event::{ChangeEvent, ChangeKind, ChannelEventSource, EventSource};
pub use fs_source::FsEventSource;
pub use watch_loop::{EventOutcome, WatchLoop, WatchState, DEFAULT_DELIVERY_TIMEOUT};
