//! `Stat` and `Fstat`.

use super::{Engine, Fd, VolumeHandle};
use crate::config::MAX_FILENAME_SIZE;
use crate::descriptor::Stat;
use crate::error::{EefsError, Result};
use crate::medium::Medium;

impl<M: Medium> Engine<M> {
    /// Implements `EEFS_LibStatFile`: looks a name up without opening it.
    pub fn stat(&self, volume: VolumeHandle, name: &[u8]) -> Result<Stat> {
        if name.is_empty() || name.len() >= MAX_FILENAME_SIZE {
            return Err(EefsError::InvalidArgument);
        }
        let mut inner = self.inner.lock();
        let slot = inner.volume_mut(volume)?;
        let index = slot.table.find_file(&mut slot.medium, name).ok_or(EefsError::FileNotFound)?;
        let header = slot.table.read_header(&mut slot.medium, index);

        Ok(Stat {
            inode_index: index,
            attributes: header.attributes,
            file_size: header.file_size,
            modification_date: header.modification_date,
            creation_date: header.creation_date,
            crc: header.crc,
            filename: header.filename,
        })
    }

    /// Implements `EEFS_LibFstatFile`: the same information, by open descriptor. Reflects
    /// the descriptor's cached `file_size`, not whatever is currently on the medium, so a
    /// writer sees its own in-flight changes before `Close` persists them.
    pub fn fstat(&self, fd: Fd) -> Result<Stat> {
        let mut inner = self.inner.lock();
        let descriptor = *inner.descriptor(fd)?;
        let slot = inner.volume_mut(VolumeHandle(descriptor.volume))?;
        let header = slot.table.read_header(&mut slot.medium, descriptor.inode_index);

        Ok(Stat {
            inode_index: descriptor.inode_index,
            attributes: header.attributes,
            file_size: descriptor.file_size,
            modification_date: header.modification_date,
            creation_date: header.creation_date,
            crc: header.crc,
            filename: header.filename,
        })
    }
}
