//! The engine's error taxonomy. One variant per code in the original API, with an
//! `as_raw_code` escape hatch for bindings that still need the signed-integer ABI
//! (`original_source/inc/eefs_fileapi.h`'s `EEFS_*` defines).

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EefsError {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("unsupported option")]
    UnsupportedOption,
    #[error("permission denied")]
    PermissionDenied,
    #[error("file not found")]
    FileNotFound,
    #[error("no free file descriptor")]
    NoFreeFileDescriptor,
    #[error("no space left on device")]
    NoSpaceLeftOnDevice,
    #[error("no such device")]
    NoSuchDevice,
    #[error("device is busy")]
    DeviceIsBusy,
    #[error("read-only file system")]
    ReadOnlyFileSystem,
}

impl EefsError {
    /// The negative sentinel the original C API returns for this condition. `Success` has no
    /// variant here — it is represented by `Ok` throughout this crate — so callers that need
    /// the original flat `int32` ABI should map `Ok(n) => n as i32` and `Err(e) =>
    /// e.as_raw_code()`.
    pub const fn as_raw_code(self) -> i32 {
        match self {
            EefsError::InvalidArgument => -2,
            EefsError::UnsupportedOption => -3,
            EefsError::PermissionDenied => -4,
            EefsError::FileNotFound => -5,
            EefsError::NoFreeFileDescriptor => -6,
            EefsError::NoSpaceLeftOnDevice => -7,
            EefsError::NoSuchDevice => -8,
            EefsError::DeviceIsBusy => -9,
            EefsError::ReadOnlyFileSystem => -10,
        }
    }
}

pub type Result<T> = core::result::Result<T, EefsError>;
