//! The four fixed-layout on-medium records. Field order here *is* the wire order — the
//! `WireCodec` derive encodes fields in declaration order, so reordering a struct changes
//! the format.

use eefs_serialize::WireCodec;

use crate::config::{MAX_FILENAME_SIZE, MAX_FILES};

/// Identifies a valid volume. `original_source` calls this `EEFS_FILESYS_MAGIC`.
pub const MAGIC: u32 = 0xEEF5_1234;

/// The only format version this crate understands.
pub const VERSION: u32 = 1;

pub const ATTRIBUTE_NONE: u32 = 0;
pub const ATTRIBUTE_READONLY: u32 = 1;

/// 24 bytes on the medium. Sits at offset 0 of every volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, WireCodec)]
pub struct FatHeader {
    /// Image checksum; populated by the image builder, never recomputed at runtime.
    pub crc: u32,
    pub magic: u32,
    pub version: u32,
    /// Byte offset from the volume base to the first unallocated byte.
    pub free_memory_offset: u32,
    /// Bytes of unallocated tail space.
    pub free_memory_size: u32,
    /// Count of occupied slots, `<= MAX_FILES`.
    pub number_of_files: u32,
}

impl FatHeader {
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC && self.version == VERSION
    }
}

/// 8 bytes on the medium. One entry per occupied slot, immediately following the header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, WireCodec)]
pub struct FatEntry {
    /// Byte offset from the volume base to the slot's file header.
    pub file_header_offset: u32,
    /// Slot payload capacity in bytes, not including the header.
    pub max_file_size: u32,
}

pub const FAT_ENTRY_SIZE: usize = 8;
pub const FAT_HEADER_SIZE: usize = 24;
pub const FILE_HEADER_SIZE: usize = 64;

/// Total size of the fixed File Allocation Table region: the header plus `MAX_FILES` entry
/// slots, reserved up front regardless of how many files actually exist. `original_source`
/// gets this for free because `EEFS_FileAllocationTable_t` embeds a `File[EEFS_MAX_FILES]`
/// array directly in the struct; this crate has to say so explicitly. The first file slot
/// always starts at `FAT_TABLE_SIZE`, never at `FAT_HEADER_SIZE` — a bare image built or
/// mounted with `FreeMemoryOffset == FAT_HEADER_SIZE` would let slot 0's header collide with
/// entry 0 of the FAT the moment `Close` wrote it.
pub const FAT_TABLE_SIZE: usize = FAT_HEADER_SIZE + MAX_FILES * FAT_ENTRY_SIZE;

/// 64 bytes on the medium: the fixed prefix of every slot, immediately followed by the
/// slot's payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WireCodec)]
pub struct FileHeader {
    /// Populated only by the image builder; the runtime engine always writes zero here.
    pub crc: u32,
    /// Non-zero means live, zero means deleted.
    pub in_use: u32,
    /// Bit 0 is `ATTRIBUTE_READONLY`.
    pub attributes: u32,
    pub file_size: u32,
    pub modification_date: u32,
    pub creation_date: u32,
    pub filename: [u8; MAX_FILENAME_SIZE],
}

impl Default for FileHeader {
    fn default() -> Self {
        FileHeader {
            crc: 0,
            in_use: 0,
            attributes: 0,
            file_size: 0,
            modification_date: 0,
            creation_date: 0,
            filename: [0u8; MAX_FILENAME_SIZE],
        }
    }
}

impl FileHeader {
    pub fn is_in_use(&self) -> bool {
        self.in_use != 0
    }

    pub fn is_read_only(&self) -> bool {
        self.attributes & ATTRIBUTE_READONLY != 0
    }

    /// Compares `name` against the zero-padded filename field, the way
    /// `original_source`'s `strncmp(Filename, FileHeader.Filename, EEFS_MAX_FILENAME_SIZE)`
    /// does: byte-for-byte up to the field width, not a C-string length comparison first.
    pub fn name_matches(&self, name: &[u8]) -> bool {
        let mut padded = [0u8; MAX_FILENAME_SIZE];
        if name.len() > padded.len() {
            return false;
        }
        padded[..name.len()].copy_from_slice(name);
        padded == self.filename
    }

    pub fn set_filename(&mut self, name: &[u8]) {
        self.filename = [0u8; MAX_FILENAME_SIZE];
        self.filename[..name.len()].copy_from_slice(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eefs_serialize::{Endianness, WireDeserialize, WireSerialize};

    #[test]
    fn fat_header_round_trips_big_endian() {
        let header = FatHeader {
            crc: 0,
            magic: MAGIC,
            version: VERSION,
            free_memory_offset: 1024,
            free_memory_size: 2048,
            number_of_files: 3,
        };
        let mut buf = [0u8; FAT_HEADER_SIZE];
        let written = header.serialize(Endianness::Big, &mut buf).unwrap();
        assert_eq!(written, FAT_HEADER_SIZE);
        assert_eq!(&buf[4..8], &[0xEE, 0xF5, 0x12, 0x34]);

        let (decoded, read) = FatHeader::deserialize(Endianness::Big, &buf).unwrap();
        assert_eq!(read, FAT_HEADER_SIZE);
        assert_eq!(decoded, header);
        assert!(decoded.is_valid());
    }

    #[test]
    fn file_header_name_matches_is_padding_aware() {
        let mut header = FileHeader::default();
        header.set_filename(b"a.dat");
        assert!(header.name_matches(b"a.dat"));
        assert!(!header.name_matches(b"a.dat2"));
        assert!(!header.name_matches(b"b.dat"));
    }
}
