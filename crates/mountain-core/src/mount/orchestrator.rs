//! Per-device mount orchestration.
//!
//! Each discovered entry moves through a short, non-persistent state
//! machine: it is skipped when mounting is disabled, ignored when its name
//! does not look like a disk, and otherwise gets a mount point and exactly
//! one mount attempt. There are no retries.

use std::ffi::OsStr;
use std::io;
use std::path::PathBuf;

use mountain_common::config::WatchConfig;

use super::mount_point::{MountPointState, ensure_mount_point};
use super::mounter::Mounter;
use super::{MountAttempt, MountOutcome, is_device_candidate, source_path, target_path};
use crate::watch::EntryHandler;

/// Terminal state reached for one discovered entry.
#[derive(Debug)]
pub enum Disposition {
    /// Mounting is disabled; nothing was touched.
    Skipped,
    /// The name does not match the removable disk heuristic.
    Ignored,
    /// The mount point could not be created, so no mount was attempted.
    MountPointUnavailable {
        /// Directory that could not be created.
        target: PathBuf,
        /// Why creation failed.
        error: io::Error,
    },
    /// `mount(2)` was called.
    Attempted(MountAttempt),
}

/// Turns discovered device names into mounts.
#[derive(Debug)]
pub struct Orchestrator<M> {
    config: WatchConfig,
    mounter: M,
}

impl<M: Mounter> Orchestrator<M> {
    /// Creates an orchestrator for the given configuration.
    pub const fn new(config: WatchConfig, mounter: M) -> Self {
        Self { config, mounter }
    }

    /// The configuration this orchestrator acts on.
    pub const fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Handles one newly created entry of the watched directory.
    pub fn handle(&self, name: impl AsRef<OsStr>) -> Disposition {
        let name = name.as_ref();
        if !self.config.mount_enabled {
            tracing::debug!(name = %name.to_string_lossy(), "Info: Found drive, but mount is off.");
            return Disposition::Skipped;
        }
        if !is_device_candidate(name) {
            tracing::debug!(name = %name.to_string_lossy(), "not a removable disk, ignoring");
            return Disposition::Ignored;
        }

        let source = source_path(&self.config.watch_path, name);
        let target = target_path(&self.config.mount_root, name);

        match ensure_mount_point(&target) {
            Ok(MountPointState::Created) => {
                tracing::debug!("Created new directory: {}.", target.display());
            }
            Ok(MountPointState::AlreadyPresent) => {
                tracing::debug!(target = %target.display(), "mount point already exists");
            }
            Err(error) => {
                tracing::warn!(error = %error, "Error creating directory: {}.", target.display());
                return Disposition::MountPointUnavailable { target, error };
            }
        }

        tracing::info!("Attempting: {} -> {}", source.display(), target.display());
        let outcome = MountOutcome::classify(self.mounter.mount(&source, &target));
        let attempt = MountAttempt {
            source_path: source,
            target_path: target,
            outcome,
        };
        report(&attempt);
        Disposition::Attempted(attempt)
    }
}

fn report(attempt: &MountAttempt) {
    match attempt.outcome {
        MountOutcome::Success => {
            tracing::info!("{}", attempt.outcome);
            tracing::info!(
                "Finished: {} -> {}",
                attempt.source_path.display(),
                attempt.target_path.display()
            );
        }
        MountOutcome::Busy | MountOutcome::PermissionDenied => {
            tracing::warn!("{}", attempt.outcome);
        }
        MountOutcome::OtherOsError(errno) => {
            tracing::warn!("{}", attempt.outcome);
            tracing::debug!("Mount error number: {}.", errno as i32);
        }
    }
}

impl<M: Mounter> EntryHandler for Orchestrator<M> {
    fn on_file_created(&mut self, name: &OsStr) {
        let _ = self.handle(name);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::os::unix::ffi::OsStrExt;
    use std::path::{Path, PathBuf};

    use nix::errno::Errno;
    use tracing_test::traced_test;

    use super::*;

    /// Records every call and answers with a fixed result.
    struct RecordingMounter {
        result: nix::Result<()>,
        calls: RefCell<Vec<(PathBuf, PathBuf)>>,
    }

    impl RecordingMounter {
        fn answering(result: nix::Result<()>) -> Self {
            Self {
                result,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(PathBuf, PathBuf)> {
            self.calls.borrow().clone()
        }
    }

    impl Mounter for RecordingMounter {
        fn mount(&self, source: &Path, target: &Path) -> nix::Result<()> {
            self.calls
                .borrow_mut()
                .push((source.to_path_buf(), target.to_path_buf()));
            self.result
        }
    }

    fn config(mount_root: &Path, mount_enabled: bool) -> WatchConfig {
        WatchConfig {
            watch_path: PathBuf::from("/dev"),
            verbose: true,
            mount_enabled,
            mount_root: mount_root.to_path_buf(),
        }
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).expect("read_dir").count()
    }

    #[traced_test]
    #[test]
    fn mounts_new_disk_on_fresh_mount_point() {
        let root = tempfile::tempdir().expect("tempdir");
        let mounter = RecordingMounter::answering(Ok(()));
        let orchestrator = Orchestrator::new(config(root.path(), true), &mounter);

        let disposition = orchestrator.handle("sdb1");

        let target = root.path().join("sdb1-mountain");
        assert!(target.is_dir());
        assert_eq!(mounter.calls(), vec![(PathBuf::from("/dev/sdb1"), target.clone())]);
        assert!(matches!(
            disposition,
            Disposition::Attempted(MountAttempt { outcome: MountOutcome::Success, .. })
        ));
        assert!(logs_contain("Created new directory"));
        assert!(logs_contain("Mount successful."));
        assert!(logs_contain(&format!("Finished: /dev/sdb1 -> {}", target.display())));
    }

    #[traced_test]
    #[test]
    fn busy_mount_point_reports_specific_message() {
        let root = tempfile::tempdir().expect("tempdir");
        let mounter = RecordingMounter::answering(Err(Errno::EBUSY));
        let orchestrator = Orchestrator::new(config(root.path(), true), &mounter);

        let disposition = orchestrator.handle("sdb1");

        assert!(matches!(
            disposition,
            Disposition::Attempted(MountAttempt { outcome: MountOutcome::Busy, .. })
        ));
        assert!(logs_contain("Mount error: mountpoint busy."));
        assert!(!logs_contain("Device or resource busy"));
        assert!(!logs_contain("Mount successful."));
    }

    #[traced_test]
    #[test]
    fn permission_denied_reports_root_hint() {
        let root = tempfile::tempdir().expect("tempdir");
        let mounter = RecordingMounter::answering(Err(Errno::EPERM));
        let orchestrator = Orchestrator::new(config(root.path(), true), &mounter);

        let _ = orchestrator.handle("sdc");

        assert!(logs_contain("unless you are root"));
    }

    #[traced_test]
    #[test]
    fn other_errors_include_description_and_number() {
        let root = tempfile::tempdir().expect("tempdir");
        let mounter = RecordingMounter::answering(Err(Errno::ENODEV));
        let orchestrator = Orchestrator::new(config(root.path(), true), &mounter);

        let disposition = orchestrator.handle("sdd1");

        assert!(matches!(
            disposition,
            Disposition::Attempted(MountAttempt {
                outcome: MountOutcome::OtherOsError(Errno::ENODEV),
                ..
            })
        ));
        assert!(logs_contain(&format!("Mount error: {}.", Errno::ENODEV.desc())));
        assert!(logs_contain(&format!("Mount error number: {}.", Errno::ENODEV as i32)));
    }

    #[traced_test]
    #[test]
    fn disabled_mounting_touches_nothing() {
        let root = tempfile::tempdir().expect("tempdir");
        let mounter = RecordingMounter::answering(Ok(()));
        let orchestrator = Orchestrator::new(config(root.path(), false), &mounter);

        for name in ["sdb1", "sda", "keyboard0"] {
            assert!(matches!(orchestrator.handle(name), Disposition::Skipped));
        }

        assert_eq!(entries(root.path()), 0);
        assert!(mounter.calls().is_empty());
        assert!(logs_contain("Found drive, but mount is off."));
    }

    #[traced_test]
    #[test]
    fn non_disk_names_are_ignored() {
        let root = tempfile::tempdir().expect("tempdir");
        let mounter = RecordingMounter::answering(Ok(()));
        let orchestrator = Orchestrator::new(config(root.path(), true), &mounter);

        for name in ["keyboard0", "tty1", "nvme0n1", "loop0", "s"] {
            assert!(matches!(orchestrator.handle(name), Disposition::Ignored));
        }

        assert_eq!(entries(root.path()), 0);
        assert!(mounter.calls().is_empty());
        assert!(!logs_contain("Attempting"));
    }

    #[test]
    fn existing_mount_point_is_reused() {
        let root = tempfile::tempdir().expect("tempdir");
        let mounter = RecordingMounter::answering(Ok(()));
        let orchestrator = Orchestrator::new(config(root.path(), true), &mounter);

        let _ = orchestrator.handle("sdb1");
        let _ = orchestrator.handle("sdb1");

        assert_eq!(entries(root.path()), 1);
        assert_eq!(mounter.calls().len(), 2);
    }

    #[traced_test]
    #[test]
    fn mount_point_failure_skips_the_mount() {
        let root = tempfile::tempdir().expect("tempdir");
        let missing_root = root.path().join("absent");
        let mounter = RecordingMounter::answering(Ok(()));
        let orchestrator = Orchestrator::new(config(&missing_root, true), &mounter);

        let disposition = orchestrator.handle("sdb1");

        match disposition {
            Disposition::MountPointUnavailable { target, error } => {
                assert_eq!(target, missing_root.join("sdb1-mountain"));
                assert_eq!(error.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected disposition: {other:?}"),
        }
        assert!(mounter.calls().is_empty());
        assert!(logs_contain("Error creating directory"));
    }

    #[test]
    fn entry_handler_drives_handle() {
        let root = tempfile::tempdir().expect("tempdir");
        let mounter = RecordingMounter::answering(Ok(()));
        let mut orchestrator = Orchestrator::new(config(root.path(), true), &mounter);

        orchestrator.on_file_created(OsStr::new("sde"));

        assert_eq!(mounter.calls().len(), 1);
        assert!(orchestrator.config().mount_enabled);
    }

    #[test]
    fn non_utf8_names_reach_mount_unchanged() {
        let root = tempfile::tempdir().expect("tempdir");
        let mounter = RecordingMounter::answering(Ok(()));
        let orchestrator = Orchestrator::new(config(root.path(), true), &mounter);

        let _ = orchestrator.handle(OsStr::from_bytes(b"sd\xff1"));

        let calls = mounter.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.as_os_str().as_bytes(), b"/dev/sd\xff1");
        assert_eq!(
            calls[0].1.file_name().map(OsStrExt::as_bytes),
            Some(&b"sd\xff1-mountain"[..])
        );
        assert!(calls[0].1.is_dir());
    }
}
