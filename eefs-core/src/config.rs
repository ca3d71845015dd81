//! Compile-time capacities. These are the Rust equivalents of
//! `original_source/inc/eefs_config.h` — module-level constants rather than a runtime
//! configuration file, matching both the original C source and the teacher's convention of
//! centralizing fixed capacities as `const` items near the types they size.

/// Maximum number of slots a single volume's File Allocation Table can hold. Changing this
/// requires rebuilding every image (`EEFS_MAX_FILES` upstream).
pub const MAX_FILES: usize = 64;

/// Size of the process-wide open-file descriptor pool, shared across every mounted volume.
pub const MAX_OPEN_FILES: usize = 20;

/// Only one directory listing may be in progress at a time, process-wide.
pub const MAX_OPEN_DIRS: usize = 1;

/// Extra bytes reserved past `FileSize` when a newly created file is closed, so that a
/// handful of subsequent appends don't each require a full re-image.
pub const DEFAULT_CREAT_SPARE_BYTES: u32 = 512;

/// Width of the on-medium filename field, including any trailing zero padding.
pub const MAX_FILENAME_SIZE: usize = 40;

/// Volume-manager limits (see the `volume` module).
pub const MAX_VOLUMES: usize = 2;
pub const MAX_DEVICES: usize = 2;
pub const MAX_DEVICENAME_SIZE: usize = 16;
pub const MAX_MOUNTPOINT_SIZE: usize = 16;
pub const MAX_PATH_SIZE: usize = 64;

/// How many `InodeTable`s a single `Engine` can hold mounted at once. A `FileDescriptor`
/// names its volume by index into this set rather than by pointer, so the cap doubles as the
/// valid range of `engine::VolumeHandle`. Set equal to `MAX_DEVICES`: nothing above the core
/// engine (see `volume`) ever mounts more volumes than it has devices for.
pub const MAX_MOUNTED_VOLUMES: usize = MAX_DEVICES;
