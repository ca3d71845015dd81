//! `LSeek`.

use super::{Engine, Fd};
use crate::descriptor::SeekFrom;
use crate::error::{EefsError, Result};
use crate::medium::Medium;

impl<M: Medium> Engine<M> {
    /// Implements `EEFS_LibSeekFile`. A negative effective position is rejected; a position
    /// past the current end of file is accepted and clamped to `file_size`, matching
    /// `original_source`'s behavior of never growing a file on seek alone.
    pub fn lseek(&self, fd: Fd, from: SeekFrom) -> Result<u32> {
        let mut inner = self.inner.lock();
        let descriptor = *inner.descriptor(fd)?;

        let requested: i64 = match from {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(delta) => descriptor.byte_offset as i64 + delta,
            SeekFrom::End(delta) => descriptor.file_size as i64 + delta,
        };

        if requested < 0 {
            return Err(EefsError::InvalidArgument);
        }

        let clamped = (requested as u32).min(descriptor.file_size);
        inner.file_descriptors[fd.0].byte_offset = clamped;
        Ok(clamped)
    }
}
