//! `Close`. The crash-consistency boundary lives in `InodeTable::commit_new_slot`; this file
//! only decides the final `file_size`/`max_file_size` a created file commits with and then
//! calls it, exactly once, as the very last thing `Close` does for that file.

use super::{round_up_4, Engine, Fd};
use crate::config::DEFAULT_CREAT_SPARE_BYTES;
use crate::descriptor::mode;
use crate::error::Result;
use crate::medium::Medium;

impl<M: Medium> Engine<M> {
    /// Implements `EEFS_LibCloseFile`.
    pub fn close(&self, fd: Fd) -> Result<()> {
        let mut inner = self.inner.lock();
        let descriptor = *inner.descriptor(fd)?;
        let volume = super::VolumeHandle(descriptor.volume);

        if descriptor.mode & mode::FWRITE != 0 {
            let slot = inner.volume_mut(volume)?;

            let mut header = slot.table.read_header(&mut slot.medium, descriptor.inode_index);
            header.file_size = descriptor.file_size;
            // A created file keeps its creation timestamp (spec §4.5.3); only a plain
            // write-close bumps ModificationDate.
            if descriptor.mode & mode::FCREAT == 0 {
                header.modification_date = slot.medium.time_now();
            }
            // Automatically updating the CRC is not supported: any header this engine
            // rewrites gets its CRC field cleared rather than left stale (§9, §11).
            header.crc = 0;
            slot.table.write_header(&mut slot.medium, descriptor.inode_index, &header);

            if descriptor.mode & mode::FCREAT != 0 {
                let desired = round_up_4(descriptor.file_size.saturating_add(DEFAULT_CREAT_SPARE_BYTES));
                let final_max_file_size = desired.min(descriptor.max_file_size);
                slot.table
                    .commit_new_slot(&mut slot.medium, descriptor.inode_index, final_max_file_size);
            }
        }

        inner.release_fd(fd);
        Ok(())
    }
}
