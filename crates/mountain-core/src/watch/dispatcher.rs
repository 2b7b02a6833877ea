//! Filters decoded events and forwards file creations to a handler.

use std::ffi::OsStr;
#[cfg(test)]
use std::ffi::OsString;

use super::decoder;

/// Receives the names of newly created (non-directory) entries.
pub trait EntryHandler {
    /// Called once per qualifying creation event, in delivery order.
    fn on_file_created(&mut self, name: &OsStr);
}

impl<H: EntryHandler + ?Sized> EntryHandler for &mut H {
    fn on_file_created(&mut self, name: &OsStr) {
        (**self).on_file_created(name);
    }
}

/// Counters describing how one batch was processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Events forwarded to the handler.
    pub dispatched: usize,
    /// Named events that did not qualify.
    pub dropped: usize,
    /// The kernel reported a queue overflow in this batch.
    pub overflowed: bool,
    /// The kernel reported that the watch is gone.
    pub watch_removed: bool,
}

/// Decodes raw batches and drives an [`EntryHandler`].
#[derive(Debug)]
pub struct Dispatcher<H> {
    handler: H,
}

impl<H: EntryHandler> Dispatcher<H> {
    /// Wraps a handler.
    pub const fn new(handler: H) -> Self {
        Self { handler }
    }

    /// The wrapped handler.
    pub const fn handler(&self) -> &H {
        &self.handler
    }

    /// Processes every record of `batch` sequentially.
    pub fn dispatch(&mut self, batch: &[u8]) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for record in decoder::records(batch, batch.len()) {
            if record.is_overflow() {
                tracing::warn!("inotify queue overflowed, some device events were lost");
                summary.overflowed = true;
                continue;
            }
            if record.is_watch_removed() {
                tracing::warn!("watch was removed by the kernel");
                summary.watch_removed = true;
                continue;
            }
            let Some(event) = record.to_event() else {
                continue;
            };

            if event.is_create && !event.is_directory {
                tracing::debug!("The file {} was created.", event.name.to_string_lossy());
                self.handler.on_file_created(&event.name);
                summary.dispatched += 1;
            } else {
                tracing::debug!(
                    name = %event.name.to_string_lossy(),
                    directory = event.is_directory,
                    create = event.is_create,
                    "ignoring event"
                );
                summary.dropped += 1;
            }
        }

        summary
    }
}
