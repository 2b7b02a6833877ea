//! # mountain-core
//!
//! The watch → filter → act pipeline behind the `mountain` daemon.
//!
//! - **Watch**: an inotify channel registered on a single directory, a
//!   cursor-based decoder for the raw event records it returns, and a
//!   dispatcher that forwards file-creation events.
//! - **Mount**: the orchestrator that turns a newly appeared device node
//!   into a `<name>-mountain` mount point and a `mount(2)` call.
//!
//! Everything runs on the calling thread. The only suspension point is
//! the wait for the next batch of events.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod mount;
pub mod watch;
