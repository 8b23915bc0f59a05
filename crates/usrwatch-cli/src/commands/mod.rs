//! Command implementations.

mod verify;
mod watch;
