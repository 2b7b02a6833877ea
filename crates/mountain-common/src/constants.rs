//! System-wide constants and default paths.

/// Application name used in CLI output.
pub const APP_NAME: &str = "mountain";

/// Directory watched when no path is configured.
pub const DEFAULT_WATCH_PATH: &str = "/dev";

/// Root under which mount points are created.
pub const DEFAULT_MOUNT_ROOT: &str = "/tmp";

/// Suffix appended to a device name to form its mount point directory.
pub const MOUNT_POINT_SUFFIX: &str = "-mountain";

/// Name prefix of removable SCSI/USB disks (`sda`, `sdb1`, ...).
pub const DEVICE_NAME_PREFIX: &str = "sd";

/// Filesystem type passed to `mount(2)`.
pub const MOUNT_FS_TYPE: &str = "vfat";

/// Permission bits for freshly created mount points (owner only).
pub const MOUNT_POINT_MODE: u32 = 0o700;

/// Number of event records a single read is sized for.
pub const MAX_BATCH_EVENTS: usize = 1024;

/// Size of the fixed `inotify_event` header in bytes.
pub const EVENT_HEADER_LEN: usize = 16;

/// Longest file name the kernel can report (`NAME_MAX`).
pub const MAX_NAME_LEN: usize = 255;

/// Capacity of the reusable event buffer.
///
/// Room for a full batch of records even when every name is `NAME_MAX`
/// bytes plus its terminating NUL.
pub const EVENT_BUFFER_LEN: usize = MAX_BATCH_EVENTS * (EVENT_HEADER_LEN + MAX_NAME_LEN + 1);

/// Consecutive failed reads tolerated before the watch loop gives up.
pub const MAX_CONSECUTIVE_READ_FAILURES: u32 = 16;

/// Readiness poll interval, in milliseconds, used to observe shutdown requests.
pub const POLL_INTERVAL_MS: u16 = 250;
