//! `Read` and `Write`. Both work from the descriptor's cached `byte_offset`/`file_size` and
//! never consult the on-medium FAT — only `Close` (and, for created files, `reserve_slot`
//! up front) ever touches FAT bytes.

use super::{Engine, Fd, VolumeHandle};
use crate::descriptor::mode;
use crate::error::{EefsError, Result};
use crate::medium::Medium;

impl<M: Medium> Engine<M> {
    /// Implements `EEFS_LibReadFile`. Reads never advance past the cached `file_size`; a
    /// read starting at or past EOF returns `Ok(0)`.
    pub fn read(&self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        let descriptor = *inner.descriptor(fd)?;
        if descriptor.mode & mode::FREAD == 0 {
            return Err(EefsError::PermissionDenied);
        }

        let available = descriptor.file_size.saturating_sub(descriptor.byte_offset) as usize;
        let n = buf.len().min(available);
        if n == 0 {
            return Ok(0);
        }

        let slot = inner.volume_mut(VolumeHandle(descriptor.volume))?;
        let addr = descriptor.file_data_pointer + descriptor.byte_offset;
        slot.medium.read(addr, &mut buf[..n]);

        inner.file_descriptors[fd.0].byte_offset += n as u32;
        Ok(n)
    }

    /// Implements `EEFS_LibWriteFile`. A write that would cross `max_file_size` is clamped
    /// to the room left, not rejected — the caller sees the short write in the returned
    /// count, matching `original_source`'s own saturating behavior.
    pub fn write(&self, fd: Fd, buf: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        let descriptor = *inner.descriptor(fd)?;
        if descriptor.mode & mode::FWRITE == 0 {
            return Err(EefsError::PermissionDenied);
        }

        let room = descriptor.max_file_size.saturating_sub(descriptor.byte_offset) as usize;
        let n = buf.len().min(room);
        if n == 0 {
            return Ok(0);
        }

        let slot = inner.volume_mut(VolumeHandle(descriptor.volume))?;
        if slot.medium.is_write_protected() {
            return Err(EefsError::ReadOnlyFileSystem);
        }
        // Payload bytes land on the medium immediately, but the medium is not flushed here —
        // the file-header update (and the flush that durably publishes it) waits for `Close`
        // (spec §4.5.5).
        let addr = descriptor.file_data_pointer + descriptor.byte_offset;
        slot.medium.write(addr, &buf[..n]);

        let new_offset = descriptor.byte_offset + n as u32;
        let updated = &mut inner.file_descriptors[fd.0];
        updated.byte_offset = new_offset;
        updated.file_size = updated.file_size.max(new_offset);

        Ok(n)
    }
}
