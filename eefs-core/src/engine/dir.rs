//! `OpenDir`/`ReadDir`/`CloseDir`. There is exactly one directory descriptor for the whole
//! engine (`MAX_OPEN_DIRS == 1`), matching `original_source`'s single static
//! `EEFS_DirectoryDescriptor`.

use super::{DirectoryDescriptor, Engine, VolumeHandle};
use crate::descriptor::DirectoryEntry;
use crate::error::{EefsError, Result};
use crate::medium::Medium;

impl<M: Medium> Engine<M> {
    /// Implements `EEFS_LibOpenDir`.
    pub fn open_dir(&self, volume: VolumeHandle) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.volume(volume)?;
        if inner.directory_descriptor.is_some() {
            return Err(EefsError::DeviceIsBusy);
        }
        inner.directory_descriptor = Some(DirectoryDescriptor {
            volume: volume.0,
            inode_index: 0,
        });
        Ok(())
    }

    /// Implements `EEFS_LibReadDir`: returns the next slot, live or deleted, or `None` once
    /// every slot in the table has been visited.
    pub fn read_dir(&self) -> Result<Option<DirectoryEntry>> {
        let mut inner = self.inner.lock();
        let dir = inner.directory_descriptor.ok_or(EefsError::InvalidArgument)?;
        let volume = VolumeHandle(dir.volume);

        let slot = inner.volume_mut(volume)?;
        if dir.inode_index >= slot.table.number_of_files {
            return Ok(None);
        }

        let header = slot.table.read_header(&mut slot.medium, dir.inode_index);
        let entry = DirectoryEntry {
            inode_index: dir.inode_index,
            file_header_pointer: slot.table.header_pointer(dir.inode_index),
            max_file_size: slot.table.max_file_size(dir.inode_index),
            in_use: header.is_in_use(),
            filename: header.filename,
        };

        inner
            .directory_descriptor
            .as_mut()
            .expect("checked Some above")
            .inode_index += 1;
        Ok(Some(entry))
    }

    /// Implements `EEFS_LibCloseDir`.
    pub fn close_dir(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.directory_descriptor.take().is_none() {
            return Err(EefsError::InvalidArgument);
        }
        Ok(())
    }
}
