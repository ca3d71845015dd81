//! `MicroFind`: the boot-time file lookup used before the full engine exists. No inode
//! table is built, no descriptor is allocated, and no lock is taken — this runs from the
//! boot loader's own minimal stack, grounded in `original_source`'s standalone `microeefs`
//! library, which exists precisely so boot code can pull one file off an EEPROM image
//! without linking the rest of this crate's RAM-hungry state.

use eefs_serialize::{Endianness, WireDeserialize};

use crate::error::{EefsError, Result};
use crate::format::{FatEntry, FatHeader, FileHeader, FAT_ENTRY_SIZE, FAT_HEADER_SIZE, FILE_HEADER_SIZE};
use crate::medium::{Medium, MediumAddress};

/// The address and size of a file's payload, as returned by `micro_find`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MicroFileLocation {
    pub data_pointer: MediumAddress,
    pub file_size: u32,
}

/// Reads the FAT at `base` directly off `medium` and scans for `name`, decoding only what's
/// needed to answer the single question "where does this file's payload start, and how long
/// is it". Every read stands alone; nothing is cached or retained across calls.
pub fn micro_find<M: Medium>(
    medium: &mut M,
    base: MediumAddress,
    endianness: Endianness,
    name: &[u8],
) -> Result<MicroFileLocation> {
    let mut header_buf = [0u8; FAT_HEADER_SIZE];
    medium.read(base, &mut header_buf);
    let (fat_header, _) = FatHeader::deserialize(endianness, &header_buf).map_err(|_| EefsError::NoSuchDevice)?;
    if !fat_header.is_valid() {
        return Err(EefsError::NoSuchDevice);
    }

    for i in 0..fat_header.number_of_files {
        let entry_addr = base + (FAT_HEADER_SIZE as u32) + i * (FAT_ENTRY_SIZE as u32);
        let mut entry_buf = [0u8; FAT_ENTRY_SIZE];
        medium.read(entry_addr, &mut entry_buf);
        let (entry, _) = FatEntry::deserialize(endianness, &entry_buf).map_err(|_| EefsError::NoSuchDevice)?;

        let header_addr = base + entry.file_header_offset;
        let mut header_buf = [0u8; FILE_HEADER_SIZE];
        medium.read(header_addr, &mut header_buf);
        let (header, _) = FileHeader::deserialize(endianness, &header_buf).map_err(|_| EefsError::NoSuchDevice)?;

        if header.is_in_use() && header.name_matches(name) {
            return Ok(MicroFileLocation {
                data_pointer: header_addr + FILE_HEADER_SIZE as u32,
                file_size: header.file_size,
            });
        }
    }

    Err(EefsError::FileNotFound)
}
