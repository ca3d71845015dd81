//! The process-wide engine: the mounted-volume table, the open-file and open-directory
//! descriptor pools, and the single global lock guarding all three. Every public operation
//! takes `&self` and locks internally — this is the "single global lock" concurrency model
//! from spec §5, not a per-volume or per-descriptor lock.
//!
//! Individual operations live in sibling modules (`open`, `close`, `read_write`, `seek`,
//! `remove_rename`, `stat`, `dir`) as `impl<M: Medium> Engine<M>` blocks; this file only
//! holds the shared state, the handle types, and the small helpers every operation needs.

mod close;
mod dir;
mod open;
mod read_write;
mod remove_rename;
mod seek;
mod stat;

use spin::Mutex;

use crate::config::{MAX_MOUNTED_VOLUMES, MAX_OPEN_FILES};
use crate::descriptor::{mode, DirectoryDescriptor, FileDescriptor};
use crate::error::{EefsError, Result};
use crate::inode::InodeTable;
use crate::medium::{Medium, MediumAddress};
use eefs_serialize::Endianness;

/// Handle to a mounted volume, returned by `Engine::init_fs`. Opaque by design — see
/// `FileDescriptor::volume` for why this replaces a raw pointer back into an `InodeTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeHandle(usize);

/// Handle to an open file, returned by `Open`/`Creat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fd(usize);

struct Slot<M> {
    table: InodeTable,
    medium: M,
}

struct Inner<M: Medium> {
    volumes: [Option<Slot<M>>; MAX_MOUNTED_VOLUMES],
    file_descriptors: [FileDescriptor; MAX_OPEN_FILES],
    fd_in_use: usize,
    fd_high_water_mark: usize,
    directory_descriptor: Option<DirectoryDescriptor>,
}

impl<M: Medium> Inner<M> {
    fn volume(&self, handle: VolumeHandle) -> Result<&Slot<M>> {
        self.volumes
            .get(handle.0)
            .and_then(|v| v.as_ref())
            .ok_or(EefsError::NoSuchDevice)
    }

    fn volume_mut(&mut self, handle: VolumeHandle) -> Result<&mut Slot<M>> {
        self.volumes
            .get_mut(handle.0)
            .and_then(|v| v.as_mut())
            .ok_or(EefsError::NoSuchDevice)
    }

    fn descriptor(&self, fd: Fd) -> Result<&FileDescriptor> {
        match self.file_descriptors.get(fd.0) {
            Some(d) if d.in_use => Ok(d),
            _ => Err(EefsError::InvalidArgument),
        }
    }

    fn has_open_creat(&self, volume: VolumeHandle) -> bool {
        self.file_descriptors
            .iter()
            .any(|d| d.in_use && d.volume == volume.0 && d.mode & mode::FCREAT != 0)
    }

    fn has_open_files(&self, volume: VolumeHandle) -> bool {
        self.file_descriptors.iter().any(|d| d.in_use && d.volume == volume.0)
    }

    fn has_open_inode(&self, volume: VolumeHandle, inode_index: u32) -> bool {
        self.file_descriptors
            .iter()
            .any(|d| d.in_use && d.volume == volume.0 && d.inode_index == inode_index)
    }

    /// Invariant 6: at most one descriptor may hold `WRITE` on a given `(volume, inode_index)`
    /// pair. Checked before handing out a new write-intent descriptor on that inode.
    fn has_open_write(&self, volume: VolumeHandle, inode_index: u32) -> bool {
        self.file_descriptors
            .iter()
            .any(|d| d.in_use && d.volume == volume.0 && d.inode_index == inode_index && d.mode & mode::FWRITE != 0)
    }

    fn allocate_fd(&mut self) -> Result<usize> {
        let index = self
            .file_descriptors
            .iter()
            .position(|d| !d.in_use)
            .ok_or(EefsError::NoFreeFileDescriptor)?;
        self.fd_in_use += 1;
        if self.fd_in_use > self.fd_high_water_mark {
            self.fd_high_water_mark = self.fd_in_use;
        }
        Ok(index)
    }

    fn release_fd(&mut self, fd: Fd) {
        self.file_descriptors[fd.0] = FileDescriptor::default();
        self.fd_in_use -= 1;
    }
}

/// The process-wide engine instance. One `Engine<M>` is enough for every volume backed by
/// the same medium type `M`; a deployment mixing medium types (RAM during bring-up,
/// EEPROM in flight) runs one `Engine` per type.
pub struct Engine<M: Medium> {
    inner: Mutex<Inner<M>>,
}

impl<M: Medium> Default for Engine<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Medium> Engine<M> {
    pub fn new() -> Self {
        Engine {
            inner: Mutex::new(Inner {
                volumes: core::array::from_fn(|_| None),
                file_descriptors: core::array::from_fn(|_| FileDescriptor::default()),
                fd_in_use: 0,
                fd_high_water_mark: 0,
                directory_descriptor: None,
            }),
        }
    }

    /// Implements `EEFS_LibInitFS`: decodes the FAT at `base` on `medium` and mounts the
    /// result under a fresh handle.
    pub fn init_fs(&self, mut medium: M, base: MediumAddress, endianness: Endianness) -> Result<VolumeHandle> {
        let table = InodeTable::init(&mut medium, base, endianness)?;
        let mut inner = self.inner.lock();
        let free_slot = inner
            .volumes
            .iter()
            .position(|v| v.is_none())
            .ok_or(EefsError::NoSuchDevice)?;
        inner.volumes[free_slot] = Some(Slot { table, medium });
        Ok(VolumeHandle(free_slot))
    }

    /// Implements `EEFS_LibFreeFS`: unmounts the volume and hands the medium back to the
    /// caller. Refuses while any file or the directory descriptor still references it.
    pub fn free_fs(&self, volume: VolumeHandle) -> Result<M> {
        let mut inner = self.inner.lock();
        inner.volume(volume)?;
        if inner.has_open_files(volume) {
            return Err(EefsError::DeviceIsBusy);
        }
        if inner.directory_descriptor.map(|d| d.volume) == Some(volume.0) {
            return Err(EefsError::DeviceIsBusy);
        }
        let slot = inner.volumes[volume.0].take().expect("checked Some above");
        Ok(slot.medium)
    }

    /// The `mode` bits (`FREAD`/`FWRITE`/`FCREAT`) an open descriptor was created with.
    pub fn fmode(&self, fd: Fd) -> Result<u32> {
        Ok(self.inner.lock().descriptor(fd)?.mode)
    }

    pub fn has_open_files(&self, volume: VolumeHandle) -> bool {
        self.inner.lock().has_open_files(volume)
    }

    pub fn has_open_creat(&self, volume: VolumeHandle) -> bool {
        self.inner.lock().has_open_creat(volume)
    }

    pub fn has_open_dir(&self) -> bool {
        self.inner.lock().directory_descriptor.is_some()
    }

    pub fn open_file_count(&self) -> usize {
        self.inner.lock().fd_in_use
    }

    pub fn open_file_high_water_mark(&self) -> usize {
        self.inner.lock().fd_high_water_mark
    }

    /// Implements `EEFS_LibGetMaxFiles`: the compiled-in cap on slots per volume.
    pub const fn max_files(&self) -> usize {
        crate::config::MAX_FILES
    }

    /// Implements `EEFS_LibGetMaxOpenFiles`: the compiled-in cap on the process-wide
    /// open-file descriptor pool.
    pub const fn max_open_files(&self) -> usize {
        MAX_OPEN_FILES
    }

    /// Dumps the inode table and per-file headers for `volume` through `eefs_log`.
    /// Implements `EEFS_LibChkDsk`.
    pub fn check_disk(&self, volume: VolumeHandle) -> Result<()> {
        let mut inner = self.inner.lock();
        let slot = inner.volume_mut(volume)?;
        slot.table.check_disk(&mut slot.medium);
        Ok(())
    }
}

pub(crate) const fn round_up_4(n: u32) -> u32 {
    (n + 3) & !3
}
