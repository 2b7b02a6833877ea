//! The inotify event source.
//!
//! [`Channel::open`] allocates the notification descriptor and
//! [`Channel::watch`] turns it into an [`EventSource`] bound to exactly one
//! directory. The source owns the reusable read buffer and hands out one
//! batch of raw bytes per [`EventSource::next_batch`] call.
//!
//! The watch loop only sees the [`BatchSource`] trait, so it can be driven
//! by something other than a live descriptor.

use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mountain_common::constants::{EVENT_BUFFER_LEN, POLL_INTERVAL_MS};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify, WatchDescriptor};

use super::WatchError;

/// Yields raw event batches to the watch loop.
pub trait BatchSource {
    /// The next batch of raw event records, or `None` once shutdown has been
    /// requested.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Read`] for a failed read that may be retried.
    /// Any other variant ends the loop.
    fn next_batch(&mut self) -> Result<Option<&[u8]>, WatchError>;

    /// Directory the batches describe.
    fn watched_path(&self) -> &Path;

    /// Releases the underlying resources.
    fn close(self)
    where
        Self: Sized;
}

/// An open inotify descriptor with no watch registered yet.
#[derive(Debug)]
pub struct Channel {
    inotify: Inotify,
    running: Arc<AtomicBool>,
}

impl Channel {
    /// Allocates a notification channel.
    ///
    /// `running` is polled while waiting for events; once it reads `false`
    /// the source stops yielding batches.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::ChannelInit`] if the kernel refuses the descriptor
    /// (for instance when the per-user instance limit is reached).
    pub fn open(running: Arc<AtomicBool>) -> Result<Self, WatchError> {
        let inotify =
            Inotify::init(InitFlags::IN_CLOEXEC).map_err(|source| WatchError::ChannelInit { source })?;
        tracing::debug!("inotify channel opened");
        Ok(Self { inotify, running })
    }

    /// Registers `path` for creation events, consuming the channel.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Register`] if the path does not exist or is not
    /// a directory.
    pub fn watch(self, path: &Path) -> Result<EventSource, WatchError> {
        let wd = self
            .inotify
            .add_watch(path, AddWatchFlags::IN_CREATE | AddWatchFlags::IN_ONLYDIR)
            .map_err(|source| WatchError::Register {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(EventSource {
            inotify: self.inotify,
            running: self.running,
            handle: WatchHandle {
                wd,
                path: path.to_path_buf(),
            },
            buffer: vec![0; EVENT_BUFFER_LEN],
        })
    }
}

/// The single directory registration held by an [`EventSource`].
#[derive(Debug, Clone)]
pub struct WatchHandle {
    wd: WatchDescriptor,
    path: PathBuf,
}

impl WatchHandle {
    /// Directory this watch is registered on.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }
}

/// A channel with one registered watch and its reusable read buffer.
#[derive(Debug)]
pub struct EventSource {
    inotify: Inotify,
    running: Arc<AtomicBool>,
    handle: WatchHandle,
    buffer: Vec<u8>,
}

impl EventSource {
    /// The active watch registration.
    pub const fn handle(&self) -> &WatchHandle {
        &self.handle
    }

    /// Blocks until the kernel has events, then returns the valid part of the
    /// read buffer.
    ///
    /// Returns `Ok(None)` once shutdown has been requested. Interrupted waits
    /// and reads are retried.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Read`] if polling or reading the descriptor fails
    /// for any reason other than interruption.
    pub fn next_batch(&mut self) -> Result<Option<&[u8]>, WatchError> {
        loop {
            if !self.running.load(Ordering::SeqCst) {
                return Ok(None);
            }

            let mut fds = [PollFd::new(self.inotify.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, PollTimeout::from(POLL_INTERVAL_MS)) {
                Ok(0) | Err(Errno::EINTR) => continue,
                Ok(_) => {}
                Err(source) => return Err(WatchError::Read { source }),
            }

            match nix::unistd::read(self.inotify.as_fd(), &mut self.buffer) {
                Ok(len) => return Ok(Some(&self.buffer[..len])),
                Err(Errno::EINTR | Errno::EAGAIN) => {}
                Err(source) => return Err(WatchError::Read { source }),
            }
        }
    }

    /// Removes the watch and closes the channel.
    ///
    /// Failures are logged and otherwise ignored; the kernel releases both
    /// on process exit regardless.
    pub fn close(self) {
        if let Err(e) = self.inotify.rm_watch(self.handle.wd) {
            tracing::debug!(path = %self.handle.path.display(), error = %e, "removing watch failed");
        }
        tracing::debug!(path = %self.handle.path.display(), "inotify channel closed");
    }
}

impl BatchSource for EventSource {
    fn next_batch(&mut self) -> Result<Option<&[u8]>, WatchError> {
        Self::next_batch(self)
    }

    fn watched_path(&self) -> &Path {
        self.handle.path()
    }

    fn close(self) {
        Self::close(self);
    }
}
