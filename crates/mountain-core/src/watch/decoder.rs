//! Cursor-based decoding of raw inotify read buffers.
//!
//! A read returns zero or more back-to-back records, each a fixed
//! 16-byte header (`wd`, `mask`, `cookie`, `len`) followed by `len` bytes
//! of NUL-padded name. The buffer is reused between reads, so nothing past
//! the reported length is ever looked at.

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

use mountain_common::constants::EVENT_HEADER_LEN;

/// One undecoded record, borrowed from the read buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<'a> {
    /// Watch descriptor the record belongs to (`-1` for queue overflow).
    pub wd: i32,
    /// Event mask bits (`IN_*`).
    pub mask: u32,
    /// Rename cookie, unused for creation events.
    pub cookie: u32,
    /// Entry name with trailing NUL padding removed. Empty when the kernel
    /// reported no name.
    pub name: &'a [u8],
}

impl RawRecord<'_> {
    /// Whether the kernel dropped events because its queue was full.
    pub const fn is_overflow(&self) -> bool {
        self.mask & libc::IN_Q_OVERFLOW != 0
    }

    /// Whether the watch was removed (directory deleted, filesystem unmounted).
    pub const fn is_watch_removed(&self) -> bool {
        self.mask & libc::IN_IGNORED != 0
    }

    /// Converts the record into a [`DirEvent`], or `None` when it carries no name.
    pub fn to_event(self) -> Option<DirEvent> {
        if self.name.is_empty() {
            return None;
        }
        Some(DirEvent {
            name: OsStr::from_bytes(self.name).to_os_string(),
            is_directory: self.mask & libc::IN_ISDIR != 0,
            is_create: self.mask & libc::IN_CREATE != 0,
        })
    }
}

/// A decoded directory change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEvent {
    /// Name of the entry relative to the watched directory, byte for byte.
    pub name: OsString,
    /// The entry is a directory.
    pub is_directory: bool,
    /// The entry was created.
    pub is_create: bool,
}

/// Iterator over the records of one read buffer.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> Iterator for Records<'a> {
    type Item = RawRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.buf.get(self.cursor..)?;
        let header = rest.get(..EVENT_HEADER_LEN)?;

        let wd = i32::from_ne_bytes(field(header, 0));
        let mask = u32::from_ne_bytes(field(header, 4));
        let cookie = u32::from_ne_bytes(field(header, 8));
        let name_len = u32::from_ne_bytes(field(header, 12)) as usize;

        // A record whose name runs past the valid region is truncated; stop.
        let padded = rest.get(EVENT_HEADER_LEN..EVENT_HEADER_LEN.checked_add(name_len)?)?;
        self.cursor += EVENT_HEADER_LEN + name_len;

        let end = padded.iter().position(|&b| b == 0).unwrap_or(padded.len());
        Some(RawRecord {
            wd,
            mask,
            cookie,
            name: &padded[..end],
        })
    }
}

fn field(header: &[u8], offset: usize) -> [u8; 4] {
    let mut out = [0; 4];
    out.copy_from_slice(&header[offset..offset + 4]);
    out
}

/// Splits the first `len` bytes of `buf` into raw records.
///
/// `len` is clamped to the buffer size.
pub fn records(buf: &[u8], len: usize) -> Records<'_> {
    Records {
        buf: &buf[..len.min(buf.len())],
        cursor: 0,
    }
}

/// Decodes the first `len` bytes of `buf` into [`DirEvent`]s, in delivery order.
///
/// Records with an empty name are skipped.
pub fn decode(buf: &[u8], len: usize) -> impl Iterator<Item = DirEvent> + '_ {
    records(buf, len).filter_map(RawRecord::to_event)
}
