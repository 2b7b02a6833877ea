//! Directory watching: event source, decoder, dispatcher, and the loop
//! that ties them together.

pub mod decoder;
pub mod dispatcher;
pub mod source;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use mountain_common::config::WatchConfig;
use mountain_common::constants::MAX_CONSECUTIVE_READ_FAILURES;
use nix::errno::Errno;
use thiserror::Error;

use crate::mount::mounter::SyscallMounter;
use crate::mount::orchestrator::Orchestrator;

pub use decoder::DirEvent;
pub use dispatcher::{BatchSummary, Dispatcher, EntryHandler};
pub use source::{BatchSource, Channel, EventSource, WatchHandle};

/// Errors raised by the watch pipeline.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The inotify descriptor could not be allocated.
    #[error("couldn't initialize inotify: {source}")]
    ChannelInit {
        /// Underlying OS error.
        source: Errno,
    },

    /// The watch could not be registered on the configured directory.
    #[error("couldn't add watch to \"{}\": {source}", path.display())]
    Register {
        /// Directory that was to be watched.
        path: PathBuf,
        /// Underlying OS error.
        source: Errno,
    },

    /// A single wait or read on the channel failed.
    #[error("read from inotify channel failed: {source}")]
    Read {
        /// Underlying OS error.
        source: Errno,
    },

    /// Reads kept failing without a single success in between.
    #[error("giving up after {attempts} consecutive failed reads: {source}")]
    ReadFailuresExhausted {
        /// Number of consecutive failures observed.
        attempts: u32,
        /// Error of the last failed read.
        source: Errno,
    },

    /// The kernel dropped the watch, so no further events can arrive.
    #[error("watch on \"{}\" was removed", path.display())]
    WatchRemoved {
        /// Directory the watch was registered on.
        path: PathBuf,
    },
}

/// Tracks consecutive read failures and decides when to stop retrying.
#[derive(Debug, Clone, Copy)]
pub struct ReadFailures {
    consecutive: u32,
    limit: u32,
}

impl Default for ReadFailures {
    fn default() -> Self {
        Self::with_limit(MAX_CONSECUTIVE_READ_FAILURES)
    }
}

impl ReadFailures {
    /// Tolerates up to `limit` consecutive failures.
    pub const fn with_limit(limit: u32) -> Self {
        Self {
            consecutive: 0,
            limit,
        }
    }

    /// Records a failed read.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::ReadFailuresExhausted`] once the limit is reached.
    pub fn record(&mut self, source: Errno) -> Result<(), WatchError> {
        self.consecutive += 1;
        tracing::warn!(attempt = self.consecutive, error = %source, "read: {}", source.desc());
        if self.consecutive >= self.limit {
            return Err(WatchError::ReadFailuresExhausted {
                attempts: self.consecutive,
                source,
            });
        }
        Ok(())
    }

    /// Clears the count after a successful read.
    pub const fn reset(&mut self) {
        self.consecutive = 0;
    }

    /// Failures recorded since the last success.
    pub const fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

/// The blocking read → decode → dispatch loop.
#[derive(Debug)]
pub struct Watcher<S, H> {
    source: S,
    dispatcher: Dispatcher<H>,
    failures: ReadFailures,
}

impl<S: BatchSource, H: EntryHandler> Watcher<S, H> {
    /// Binds an event source to a handler.
    pub fn new(source: S, handler: H) -> Self {
        Self {
            source,
            dispatcher: Dispatcher::new(handler),
            failures: ReadFailures::default(),
        }
    }

    /// Runs until shutdown is requested or a fatal error occurs.
    ///
    /// Each batch is fully processed before the next read is issued.
    ///
    /// # Errors
    ///
    /// Returns an error if reads keep failing or the watch disappears.
    pub fn run(mut self) -> Result<(), WatchError> {
        loop {
            let batch = match self.source.next_batch() {
                Ok(Some(batch)) => batch,
                Ok(None) => break,
                Err(WatchError::Read { source }) => {
                    self.failures.record(source)?;
                    continue;
                }
                Err(e) => return Err(e),
            };
            self.failures.reset();

            let summary = self.dispatcher.dispatch(batch);
            if summary.watch_removed {
                return Err(WatchError::WatchRemoved {
                    path: self.source.watched_path().to_path_buf(),
                });
            }
        }

        tracing::info!("shutdown requested, stopping watch");
        self.source.close();
        Ok(())
    }
}

/// Opens the channel, registers the configured directory, and runs the
/// mount pipeline until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the channel or watch cannot be set up, or if the
/// loop ends fatally.
pub fn run(config: WatchConfig, running: Arc<AtomicBool>) -> Result<(), WatchError> {
    let source = Channel::open(running)?.watch(&config.watch_path)?;
    tracing::info!("Watching \"{}\"", config.watch_path.display());

    let orchestrator = Orchestrator::new(config, SyscallMounter);
    Watcher::new(source, orchestrator).run()
}
