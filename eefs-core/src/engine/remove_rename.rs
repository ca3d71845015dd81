//! `Remove`, `Rename` and `SetFileAttributes`. All three act on a name, not a descriptor.

use super::{Engine, VolumeHandle};
use crate::config::MAX_FILENAME_SIZE;
use crate::error::{EefsError, Result};
use crate::format::ATTRIBUTE_READONLY;
use crate::medium::Medium;

impl<M: Medium> Engine<M> {
    /// Implements `EEFS_LibDeleteFile`. Deletion only clears the header's `in_use` flag —
    /// the slot's FAT entry and reserved space are left exactly as they were, to be reused
    /// only if a future image rebuild reclaims it. Nothing here touches `free_memory_size`.
    pub fn remove(&self, volume: VolumeHandle, name: &[u8]) -> Result<()> {
        validate_name(name)?;
        let mut inner = self.inner.lock();

        let slot = inner.volume_mut(volume)?;
        if slot.medium.is_write_protected() {
            return Err(EefsError::ReadOnlyFileSystem);
        }
        let index = slot.table.find_file(&mut slot.medium, name).ok_or(EefsError::FileNotFound)?;
        let header = slot.table.read_header(&mut slot.medium, index);
        if header.is_read_only() {
            return Err(EefsError::PermissionDenied);
        }

        // Spec §7: removing a file with any descriptor open on it is `PermissionDenied`, not
        // `DeviceIsBusy` — that code is reserved for `FreeFS` on a busy volume.
        if inner.has_open_inode(volume, index) {
            return Err(EefsError::PermissionDenied);
        }

        let slot = inner.volume_mut(volume)?;
        let mut header = slot.table.read_header(&mut slot.medium, index);
        header.in_use = 0;
        slot.table.write_header(&mut slot.medium, index, &header);
        Ok(())
    }

    /// Implements `EEFS_LibRenameFile`. `Rename(name, name)` is rejected rather than silently
    /// succeeding (DESIGN.md) — it falls out of the same check as any other already-live
    /// `new_name`, since `old_name` is still live under that name when the check runs.
    pub fn rename(&self, volume: VolumeHandle, old_name: &[u8], new_name: &[u8]) -> Result<()> {
        validate_name(old_name)?;
        validate_name(new_name)?;

        let mut inner = self.inner.lock();
        let slot = inner.volume_mut(volume)?;
        if slot.medium.is_write_protected() {
            return Err(EefsError::ReadOnlyFileSystem);
        }
        // Checked before `old_name`'s lookup, matching `EEFS_LibRename`: an already-live
        // `new_name` is `PermissionDenied`, not `InvalidArgument` (spec §8 scenario 6).
        if slot.table.find_file(&mut slot.medium, new_name).is_some() {
            return Err(EefsError::PermissionDenied);
        }
        let index = slot.table.find_file(&mut slot.medium, old_name).ok_or(EefsError::FileNotFound)?;

        let mut header = slot.table.read_header(&mut slot.medium, index);
        if header.is_read_only() {
            return Err(EefsError::PermissionDenied);
        }
        header.set_filename(new_name);
        slot.table.write_header(&mut slot.medium, index, &header);
        Ok(())
    }

    /// Implements `EEFS_LibSetFileAttributes`.
    pub fn set_file_attributes(&self, volume: VolumeHandle, name: &[u8], attributes: u32) -> Result<()> {
        if attributes & !ATTRIBUTE_READONLY != 0 {
            return Err(EefsError::InvalidArgument);
        }
        validate_name(name)?;

        let mut inner = self.inner.lock();
        let slot = inner.volume_mut(volume)?;
        if slot.medium.is_write_protected() {
            return Err(EefsError::ReadOnlyFileSystem);
        }
        let index = slot.table.find_file(&mut slot.medium, name).ok_or(EefsError::FileNotFound)?;

        let mut header = slot.table.read_header(&mut slot.medium, index);
        header.attributes = attributes;
        slot.table.write_header(&mut slot.medium, index, &header);
        Ok(())
    }
}

fn validate_name(name: &[u8]) -> Result<()> {
    if name.is_empty() || name.len() >= MAX_FILENAME_SIZE {
        return Err(EefsError::InvalidArgument);
    }
    Ok(())
}
