//! `Open` and `Creat`. Grounded in `EEFS_LibOpenFile`/`EEFS_LibCreatFile`: `Open` is a thin
//! dispatcher that falls through to the `Creat` path when `O_CREAT` is set and the name is
//! absent, exactly as `kernel`'s `ext2::open` falls through to `ext2::create_file`.

use super::{Engine, Fd, Inner, VolumeHandle};
use crate::config::MAX_FILENAME_SIZE;
use crate::descriptor::{mode, open_flags, FileDescriptor};
use crate::error::{EefsError, Result};
use crate::format::{FileHeader, ATTRIBUTE_READONLY, FILE_HEADER_SIZE};
use crate::medium::Medium;

impl<M: Medium> Engine<M> {
    /// Implements `EEFS_LibOpenFile`. `flags` is a mask of `open_flags::*`; any bit outside
    /// `open_flags::SUPPORTED` is rejected.
    pub fn open(&self, volume: VolumeHandle, name: &[u8], flags: u32) -> Result<Fd> {
        validate_name(name)?;
        if flags & !open_flags::SUPPORTED != 0 {
            return Err(EefsError::InvalidArgument);
        }

        let mut inner = self.inner.lock();
        let found = {
            let slot = inner.volume_mut(volume)?;
            slot.table.find_file(&mut slot.medium, name)
        };

        let index = match found {
            Some(index) => index,
            None if flags & open_flags::O_CREAT != 0 => {
                return self.creat_locked(&mut inner, volume, name, crate::format::ATTRIBUTE_NONE);
            }
            None => return Err(EefsError::FileNotFound),
        };

        self.internal_open(&mut inner, volume, index, flags)
    }

    /// Implements the "internal open" of spec §4.5.1: rejects unsupported flags, write intent
    /// against write-protected media, write intent against a read-only file, and write intent
    /// that would give a second descriptor `WRITE` on the same inode (invariant 6).
    fn internal_open(&self, inner: &mut Inner<M>, volume: VolumeHandle, index: u32, flags: u32) -> Result<Fd> {
        let accmode = flags & open_flags::O_ACCMODE;
        let wants_write = accmode != open_flags::O_RDONLY;

        if wants_write && inner.has_open_write(volume, index) {
            return Err(EefsError::PermissionDenied);
        }

        let (header, write_protected) = {
            let slot = inner.volume_mut(volume)?;
            (slot.table.read_header(&mut slot.medium, index), slot.medium.is_write_protected())
        };

        if wants_write && header.is_read_only() {
            return Err(EefsError::PermissionDenied);
        }
        if wants_write && write_protected {
            return Err(EefsError::ReadOnlyFileSystem);
        }

        let fd_index = inner.allocate_fd()?;
        let slot = inner.volume(volume)?;
        let header_pointer = slot.table.header_pointer(index);
        let max_file_size = slot.table.max_file_size(index);

        let mut descriptor_mode = 0;
        if accmode == open_flags::O_RDONLY || accmode == open_flags::O_RDWR {
            descriptor_mode |= mode::FREAD;
        }
        if wants_write {
            descriptor_mode |= mode::FWRITE;
        }

        let file_size = if flags & open_flags::O_TRUNC != 0 { 0 } else { header.file_size };

        inner.file_descriptors[fd_index] = FileDescriptor {
            in_use: true,
            mode: descriptor_mode,
            volume: volume.0,
            inode_index: index,
            file_header_pointer: header_pointer,
            file_data_pointer: header_pointer + FILE_HEADER_SIZE as u32,
            byte_offset: 0,
            file_size,
            max_file_size,
        };

        Ok(Fd(fd_index))
    }

    /// Implements `EEFS_LibCreatFile`: reserves the next FAT slot and writes a fresh header
    /// at the current free-memory pointer. The slot isn't visible to `FindFile`/`ReadDir`,
    /// and nothing reaches the on-medium FAT, until `Close` runs `commit_new_slot` (spec
    /// §4.5.3).
    pub fn creat(&self, volume: VolumeHandle, name: &[u8], attributes: u32) -> Result<Fd> {
        validate_name(name)?;
        let mut inner = self.inner.lock();
        self.creat_locked(&mut inner, volume, name, attributes)
    }

    pub(super) fn creat_locked(
        &self,
        inner: &mut Inner<M>,
        volume: VolumeHandle,
        name: &[u8],
        attributes: u32,
    ) -> Result<Fd> {
        // Invariant 7: single creator per volume. spec §7 files this under
        // `PermissionDenied`, not `DeviceIsBusy` (that code is reserved for volume-level
        // busy conditions: `FreeFS`/`OpenDir` against outstanding descriptors).
        if inner.has_open_creat(volume) {
            return Err(EefsError::PermissionDenied);
        }

        let existing = {
            let slot = inner.volume_mut(volume)?;
            slot.table.find_file(&mut slot.medium, name)
        };
        if let Some(index) = existing {
            return self.internal_open(inner, volume, index, open_flags::O_WRONLY | open_flags::O_TRUNC);
        }

        if attributes & !ATTRIBUTE_READONLY != 0 {
            return Err(EefsError::InvalidArgument);
        }

        {
            let slot = inner.volume(volume)?;
            if slot.medium.is_write_protected() {
                return Err(EefsError::ReadOnlyFileSystem);
            }
        }

        let fd_index = inner.allocate_fd()?;

        let slot = inner.volume_mut(volume)?;
        let (index, header_pointer, tentative_max_size) = match slot.table.reserve_slot() {
            Ok(reserved) => reserved,
            Err(e) => {
                inner.release_fd(Fd(fd_index));
                return Err(e);
            }
        };

        let mut header = FileHeader::default();
        header.in_use = 1;
        header.attributes = attributes;
        header.creation_date = slot.medium.time_now();
        header.modification_date = header.creation_date;
        header.set_filename(name);
        slot.table.write_header(&mut slot.medium, index, &header);

        inner.file_descriptors[fd_index] = FileDescriptor {
            in_use: true,
            mode: mode::FWRITE | mode::FCREAT,
            volume: volume.0,
            inode_index: index,
            file_header_pointer: header_pointer,
            file_data_pointer: header_pointer + FILE_HEADER_SIZE as u32,
            byte_offset: 0,
            file_size: 0,
            max_file_size: tentative_max_size,
        };

        Ok(Fd(fd_index))
    }
}

fn validate_name(name: &[u8]) -> Result<()> {
    if name.is_empty() || name.len() >= MAX_FILENAME_SIZE {
        return Err(EefsError::InvalidArgument);
    }
    Ok(())
}
