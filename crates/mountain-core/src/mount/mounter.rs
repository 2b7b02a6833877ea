//! The `mount(2)` boundary.

use std::path::Path;

use mountain_common::constants::MOUNT_FS_TYPE;
use nix::mount::{MsFlags, mount};

/// Performs the actual mount of a device on a directory.
pub trait Mounter {
    /// Mounts `source` on `target`.
    ///
    /// # Errors
    ///
    /// Returns the raw OS error reported by the kernel.
    fn mount(&self, source: &Path, target: &Path) -> nix::Result<()>;
}

/// Issues `mount(2)` with the fixed filesystem type and `MS_NOATIME`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyscallMounter;

impl Mounter for SyscallMounter {
    fn mount(&self, source: &Path, target: &Path) -> nix::Result<()> {
        mount(
            Some(source),
            target,
            Some(MOUNT_FS_TYPE),
            MsFlags::MS_NOATIME,
            None::<&str>,
        )
    }
}

impl<M: Mounter + ?Sized> Mounter for &M {
    fn mount(&self, source: &Path, target: &Path) -> nix::Result<()> {
        (**self).mount(source, target)
    }
}
