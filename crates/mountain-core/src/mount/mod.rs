//! Mounting of newly discovered devices.
//!
//! A device node `<watch_path>/<name>` is mounted on
//! `<mount_root>/<name>-mountain` with a fixed filesystem type and
//! `MS_NOATIME`. Mount points are created on demand and never removed.

pub mod mount_point;
pub mod mounter;
pub mod orchestrator;

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use mountain_common::constants::{DEVICE_NAME_PREFIX, MOUNT_POINT_SUFFIX};
use nix::errno::Errno;

pub use mount_point::{MountPointState, ensure_mount_point};
pub use mounter::{Mounter, SyscallMounter};
pub use orchestrator::{Disposition, Orchestrator};

/// Whether `name` looks like a removable disk or one of its partitions.
pub fn is_device_candidate(name: &OsStr) -> bool {
    name.as_bytes().starts_with(DEVICE_NAME_PREFIX.as_bytes())
}

/// Device node path for an entry of the watched directory.
pub fn source_path(watch_path: &Path, name: &OsStr) -> PathBuf {
    watch_path.join(name)
}

/// Mount point path for a device name. Non-UTF-8 bytes are kept as is.
pub fn target_path(mount_root: &Path, name: &OsStr) -> PathBuf {
    let mut dir = OsString::with_capacity(name.len() + MOUNT_POINT_SUFFIX.len());
    dir.push(name);
    dir.push(MOUNT_POINT_SUFFIX);
    mount_root.join(dir)
}

/// Classified result of a single `mount(2)` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// The filesystem is mounted.
    Success,
    /// The mount point or device is already in use (`EBUSY`).
    Busy,
    /// The caller lacks `CAP_SYS_ADMIN` (`EPERM`).
    PermissionDenied,
    /// Any other OS error.
    OtherOsError(Errno),
}

impl MountOutcome {
    /// Maps the result of a mount call onto an outcome.
    pub fn classify(result: nix::Result<()>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(Errno::EBUSY) => Self::Busy,
            Err(Errno::EPERM) => Self::PermissionDenied,
            Err(errno) => Self::OtherOsError(errno),
        }
    }

    /// Whether the mount went through.
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for MountOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "Mount successful."),
            Self::Busy => write!(f, "Mount error: mountpoint busy."),
            Self::PermissionDenied => write!(
                f,
                "Mount error: you cannot perform this operation unless you are root."
            ),
            Self::OtherOsError(errno) => write!(f, "Mount error: {}.", errno.desc()),
        }
    }
}

/// One mount attempt and its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountAttempt {
    /// Device node that was mounted.
    pub source_path: PathBuf,
    /// Directory it was mounted on.
    pub target_path: PathBuf,
    /// What the kernel said.
    pub outcome: MountOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_requires_sd_prefix() {
        for name in ["sda", "sdb1"] {
            assert!(is_device_candidate(OsStr::new(name)), "{name}");
        }
        for name in ["keyboard0", "s", "nvme0n1", "tty0", ""] {
            assert!(!is_device_candidate(OsStr::new(name)), "{name}");
        }
        assert!(is_device_candidate(OsStr::from_bytes(b"sd\xff")));
    }

    #[test]
    fn paths_follow_naming_convention() {
        let name = OsStr::new("sdb1");
        assert_eq!(source_path(Path::new("/dev"), name), PathBuf::from("/dev/sdb1"));
        assert_eq!(
            target_path(Path::new("/tmp"), name),
            PathBuf::from("/tmp/sdb1-mountain")
        );
    }

    #[test]
    fn paths_keep_non_utf8_bytes() {
        let name = OsStr::from_bytes(b"sd\xfe1");
        assert_eq!(
            source_path(Path::new("/dev"), name).as_os_str().as_bytes(),
            b"/dev/sd\xfe1"
        );
        assert_eq!(
            target_path(Path::new("/tmp"), name).as_os_str().as_bytes(),
            b"/tmp/sd\xfe1-mountain"
        );
    }

    #[test]
    fn classify_maps_errno_taxonomy() {
        assert_eq!(MountOutcome::classify(Ok(())), MountOutcome::Success);
        assert_eq!(MountOutcome::classify(Err(Errno::EBUSY)), MountOutcome::Busy);
        assert_eq!(
            MountOutcome::classify(Err(Errno::EPERM)),
            MountOutcome::PermissionDenied
        );
        assert_eq!(
            MountOutcome::classify(Err(Errno::ENOENT)),
            MountOutcome::OtherOsError(Errno::ENOENT)
        );
    }

    #[test]
    fn busy_message_is_distinct_from_generic_error() {
        let busy = MountOutcome::Busy.to_string();
        assert_eq!(busy, "Mount error: mountpoint busy.");
        assert_ne!(busy, MountOutcome::OtherOsError(Errno::EBUSY).to_string());
    }

    #[test]
    fn other_error_uses_os_description() {
        assert_eq!(
            MountOutcome::OtherOsError(Errno::ENOENT).to_string(),
            "Mount error: No such file or directory."
        );
    }
}
