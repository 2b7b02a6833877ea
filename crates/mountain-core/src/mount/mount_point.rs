//! Idempotent creation of mount point directories.

use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;

use mountain_common::constants::MOUNT_POINT_MODE;

/// What [`ensure_mount_point`] found or did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountPointState {
    /// The directory was created by this call.
    Created,
    /// Something already existed at the path.
    AlreadyPresent,
}

/// Creates `path` with owner-only permissions unless it already exists.
///
/// Only the final component is created. Another process creating the same
/// directory concurrently is reported as [`MountPointState::AlreadyPresent`].
///
/// # Errors
///
/// Returns the underlying I/O error if the directory cannot be created.
pub fn ensure_mount_point(path: &Path) -> io::Result<MountPointState> {
    if path.symlink_metadata().is_ok() {
        return Ok(MountPointState::AlreadyPresent);
    }

    match std::fs::DirBuilder::new().mode(MOUNT_POINT_MODE).create(path) {
        Ok(()) => Ok(MountPointState::Created),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(MountPointState::AlreadyPresent),
        Err(e) => Err(e),
    }
}
