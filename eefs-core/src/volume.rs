//! The path-qualified layer on top of `engine::Engine`: a device table, a mount table, and
//! `"/MountPoint/Filename"` path splitting. Grounded in
//! `original_source/drivers/standalone_driver/eefs_filesys.c`, which is the thin shim that
//! lets flight software open files by path instead of carrying an `InodeTable` handle
//! around everywhere.
//!
//! EEFS has no subdirectories: a path is always exactly one mount point and one filename,
//! never nested further.

use heapless::Vec as HVec;
use spin::Mutex;

use crate::config::{MAX_DEVICENAME_SIZE, MAX_DEVICES, MAX_FILENAME_SIZE, MAX_MOUNTPOINT_SIZE, MAX_VOLUMES};
use crate::descriptor::{DirectoryEntry, SeekFrom, Stat};
use crate::engine::{Engine, Fd, VolumeHandle};
use crate::error::{EefsError, Result};
use crate::medium::{Medium, MediumAddress};
use eefs_serialize::Endianness;

#[derive(Clone, Copy)]
struct FixedName<const N: usize> {
    bytes: [u8; N],
    len: usize,
}

impl<const N: usize> FixedName<N> {
    fn new(src: &[u8]) -> Result<Self> {
        if src.is_empty() || src.len() > N {
            return Err(EefsError::InvalidArgument);
        }
        let mut bytes = [0u8; N];
        bytes[..src.len()].copy_from_slice(src);
        Ok(FixedName { bytes, len: src.len() })
    }

    fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

struct DeviceEntry {
    name: FixedName<MAX_DEVICENAME_SIZE>,
    volume: VolumeHandle,
}

struct MountEntry {
    mount_point: FixedName<MAX_MOUNTPOINT_SIZE>,
    device_index: usize,
}

/// Owns every mounted volume for one medium type, plus the device/mount-point names used to
/// address them by path. Sits directly on top of `Engine` — nothing here touches a `Medium`
/// or an `InodeTable` itself.
pub struct VolumeManager<M: Medium> {
    engine: Engine<M>,
    devices: Mutex<HVec<DeviceEntry, MAX_DEVICES>>,
    mounts: Mutex<HVec<MountEntry, MAX_VOLUMES>>,
}

impl<M: Medium> Default for VolumeManager<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Medium> VolumeManager<M> {
    pub fn new() -> Self {
        VolumeManager {
            engine: Engine::new(),
            devices: Mutex::new(HVec::new()),
            mounts: Mutex::new(HVec::new()),
        }
    }

    /// Access to the underlying engine, for operations (`Read`/`Write`/`LSeek`/`Fstat`/
    /// diagnostics) that take a descriptor rather than a path.
    pub fn engine(&self) -> &Engine<M> {
        &self.engine
    }

    /// Implements `EEFS_InitFS`: decodes the FAT at `base_address` on `medium` and
    /// registers it under `device_name`, not yet reachable by path until `mount`.
    pub fn init_fs(&self, device_name: &[u8], medium: M, base_address: u32, endianness: Endianness) -> Result<()> {
        let name = FixedName::new(device_name)?;
        let mut devices = self.devices.lock();
        if devices.iter().any(|d| d.name.as_slice() == name.as_slice()) {
            return Err(EefsError::InvalidArgument);
        }
        let volume = self.engine.init_fs(medium, MediumAddress(base_address), endianness)?;
        devices
            .push(DeviceEntry { name, volume })
            .map_err(|_| EefsError::NoSpaceLeftOnDevice)?;
        Ok(())
    }

    /// Implements `EEFS_Mount`: attaches a mount-point name to an already-initialized
    /// device, making `"/MountPoint/Filename"` paths resolvable.
    pub fn mount(&self, device_name: &[u8], mount_point: &[u8]) -> Result<()> {
        let mount_name = FixedName::new(mount_point)?;
        let devices = self.devices.lock();
        let device_index = devices
            .iter()
            .position(|d| d.name.as_slice() == device_name)
            .ok_or(EefsError::NoSuchDevice)?;

        let mut mounts = self.mounts.lock();
        if mounts.iter().any(|m| m.mount_point.as_slice() == mount_name.as_slice()) {
            return Err(EefsError::InvalidArgument);
        }
        mounts
            .push(MountEntry {
                mount_point: mount_name,
                device_index,
            })
            .map_err(|_| EefsError::NoSpaceLeftOnDevice)?;
        Ok(())
    }

    /// Implements `EEFS_UnMount`: removes the path alias. The device stays initialized and
    /// can be remounted under a different mount point.
    pub fn unmount(&self, mount_point: &[u8]) -> Result<()> {
        let mut mounts = self.mounts.lock();
        let index = mounts
            .iter()
            .position(|m| m.mount_point.as_slice() == mount_point)
            .ok_or(EefsError::NoSuchDevice)?;
        mounts.swap_remove(index);
        Ok(())
    }

    fn resolve(&self, path: &[u8]) -> Result<(VolumeHandle, HVec<u8, MAX_FILENAME_SIZE>)> {
        let (mount_point, filename) = split_path(path)?;
        let mounts = self.mounts.lock();
        let mount = mounts
            .iter()
            .find(|m| m.mount_point.as_slice() == mount_point)
            .ok_or(EefsError::NoSuchDevice)?;

        let devices = self.devices.lock();
        let device = &devices[mount.device_index];
        let mut owned = HVec::new();
        owned.extend_from_slice(filename).map_err(|_| EefsError::InvalidArgument)?;
        Ok((device.volume, owned))
    }

    pub fn open(&self, path: &[u8], flags: u32) -> Result<Fd> {
        let (volume, name) = self.resolve(path)?;
        self.engine.open(volume, &name, flags)
    }

    pub fn creat(&self, path: &[u8], attributes: u32) -> Result<Fd> {
        let (volume, name) = self.resolve(path)?;
        self.engine.creat(volume, &name, attributes)
    }

    pub fn close(&self, fd: Fd) -> Result<()> {
        self.engine.close(fd)
    }

    pub fn read(&self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        self.engine.read(fd, buf)
    }

    pub fn write(&self, fd: Fd, buf: &[u8]) -> Result<usize> {
        self.engine.write(fd, buf)
    }

    pub fn lseek(&self, fd: Fd, from: SeekFrom) -> Result<u32> {
        self.engine.lseek(fd, from)
    }

    pub fn remove(&self, path: &[u8]) -> Result<()> {
        let (volume, name) = self.resolve(path)?;
        self.engine.remove(volume, &name)
    }

    pub fn rename(&self, old_path: &[u8], new_path: &[u8]) -> Result<()> {
        let (old_volume, old_name) = self.resolve(old_path)?;
        let (new_volume, new_name) = self.resolve(new_path)?;
        if old_volume != new_volume {
            return Err(EefsError::InvalidArgument);
        }
        self.engine.rename(old_volume, &old_name, &new_name)
    }

    pub fn stat(&self, path: &[u8]) -> Result<Stat> {
        let (volume, name) = self.resolve(path)?;
        self.engine.stat(volume, &name)
    }

    pub fn fstat(&self, fd: Fd) -> Result<Stat> {
        self.engine.fstat(fd)
    }

    pub fn set_file_attributes(&self, path: &[u8], attributes: u32) -> Result<()> {
        let (volume, name) = self.resolve(path)?;
        self.engine.set_file_attributes(volume, &name, attributes)
    }

    /// `OpenDir`/`ReadDir`/`CloseDir` address a mount point, not a full path — there is
    /// nothing below a mount point to descend into.
    pub fn open_dir(&self, mount_point: &[u8]) -> Result<()> {
        let mounts = self.mounts.lock();
        let mount = mounts
            .iter()
            .find(|m| m.mount_point.as_slice() == mount_point)
            .ok_or(EefsError::NoSuchDevice)?;
        let devices = self.devices.lock();
        let volume = devices[mount.device_index].volume;
        self.engine.open_dir(volume)
    }

    pub fn read_dir(&self) -> Result<Option<DirectoryEntry>> {
        self.engine.read_dir()
    }

    pub fn close_dir(&self) -> Result<()> {
        self.engine.close_dir()
    }
}

/// Splits `"/MountPoint/Filename"` into its two components. Rejects anything without
/// exactly one internal `/`, matching `EEFS_SplitPath_t`'s flat (non-hierarchical) model.
fn split_path(path: &[u8]) -> Result<(&[u8], &[u8])> {
    if path.first() != Some(&b'/') {
        return Err(EefsError::InvalidArgument);
    }
    let rest = &path[1..];
    let slash = rest.iter().position(|&b| b == b'/').ok_or(EefsError::InvalidArgument)?;
    let mount_point = &rest[..slash];
    let filename = &rest[slash + 1..];
    if mount_point.is_empty() || filename.is_empty() || filename.contains(&b'/') {
        return Err(EefsError::InvalidArgument);
    }
    Ok((mount_point, filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_a_well_formed_path() {
        let (mount, name) = split_path(b"/EEPROM/a.dat").unwrap();
        assert_eq!(mount, b"EEPROM");
        assert_eq!(name, b"a.dat");
    }

    #[test]
    fn rejects_missing_leading_slash_and_nested_paths() {
        assert!(split_path(b"EEPROM/a.dat").is_err());
        assert!(split_path(b"/EEPROM/sub/a.dat").is_err());
        assert!(split_path(b"/EEPROM/").is_err());
        assert!(split_path(b"//a.dat").is_err());
    }
}
