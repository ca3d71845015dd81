//! The in-RAM mirror of a volume's File Allocation Table. Where the on-medium FAT holds
//! offsets relative to the volume's base address, the inode table holds absolute
//! `MediumAddress` values — this indirection is what lets the same image be mounted at any
//! base address (see spec §3).

use heapless::Vec;

use crate::config::MAX_FILES;
use crate::error::{EefsError, Result};
use crate::format::{FatEntry, FatHeader, FileHeader, FAT_ENTRY_SIZE, FAT_HEADER_SIZE, FILE_HEADER_SIZE};
use crate::medium::{Medium, MediumAddress};
use eefs_serialize::{Endianness, WireDeserialize, WireSerialize};

/// One entry per occupied slot: where its header lives, and how big its payload may grow.
#[derive(Debug, Clone, Copy, Default)]
pub struct InodeEntry {
    pub file_header_pointer: MediumAddress,
    pub max_file_size: u32,
}

/// The per-volume in-RAM directory of slots. Created by `InitFS`, destroyed by `FreeFS`.
pub struct InodeTable {
    pub base: MediumAddress,
    pub free_memory_pointer: MediumAddress,
    pub free_memory_size: u32,
    pub number_of_files: u32,
    pub entries: Vec<InodeEntry, MAX_FILES>,
    pub endianness: Endianness,
}

impl InodeTable {
    /// Decodes the FAT at `base` and builds the in-RAM mirror. Rejects a bad magic,
    /// version, or file count with `NoSuchDevice`, matching `EEFS_LibInitFS`.
    pub fn init<M: Medium>(medium: &mut M, base: MediumAddress, endianness: Endianness) -> Result<InodeTable> {
        medium.lock();
        let mut buf = [0u8; FAT_HEADER_SIZE];
        medium.read(base, &mut buf);
        let (header, _) = FatHeader::deserialize(endianness, &buf).map_err(|_| EefsError::NoSuchDevice)?;

        if !header.is_valid() || header.number_of_files as usize > MAX_FILES {
            medium.unlock();
            return Err(EefsError::NoSuchDevice);
        }

        let mut entries = Vec::new();
        for i in 0..header.number_of_files {
            let entry_addr = base + (FAT_HEADER_SIZE as u32) + i * (FAT_ENTRY_SIZE as u32);
            let mut entry_buf = [0u8; FAT_ENTRY_SIZE];
            medium.read(entry_addr, &mut entry_buf);
            let (entry, _) = FatEntry::deserialize(endianness, &entry_buf).map_err(|_| EefsError::NoSuchDevice)?;
            // `push` cannot fail: `number_of_files <= MAX_FILES` was checked above.
            let _ = entries.push(InodeEntry {
                file_header_pointer: base + entry.file_header_offset,
                max_file_size: entry.max_file_size,
            });
        }

        medium.unlock();

        Ok(InodeTable {
            base,
            free_memory_pointer: base + header.free_memory_offset,
            free_memory_size: header.free_memory_size,
            number_of_files: header.number_of_files,
            entries,
            endianness,
        })
    }

    /// Sequential scan for a live slot named `name`. `original_source`'s
    /// `EEFS_LibFindFile` compares up to the fixed filename width, ignoring slots whose
    /// header has `InUse == 0`.
    pub fn find_file<M: Medium>(&self, medium: &mut M, name: &[u8]) -> Option<u32> {
        for i in 0..self.number_of_files {
            let header = self.read_header(medium, i);
            if header.is_in_use() && header.name_matches(name) {
                return Some(i);
            }
        }
        None
    }

    pub fn read_header<M: Medium>(&self, medium: &mut M, index: u32) -> FileHeader {
        let addr = self.entries[index as usize].file_header_pointer;
        let mut buf = [0u8; FILE_HEADER_SIZE];
        medium.read(addr, &mut buf);
        FileHeader::deserialize(self.endianness, &buf)
            .expect("buf is exactly FILE_HEADER_SIZE bytes")
            .0
    }

    pub fn write_header<M: Medium>(&self, medium: &mut M, index: u32, header: &FileHeader) {
        let addr = self.entries[index as usize].file_header_pointer;
        let mut buf = [0u8; FILE_HEADER_SIZE];
        header
            .serialize(self.endianness, &mut buf)
            .expect("buf is exactly FILE_HEADER_SIZE bytes");
        medium.write(addr, &buf);
        medium.flush();
    }

    pub fn header_pointer(&self, index: u32) -> MediumAddress {
        self.entries[index as usize].file_header_pointer
    }

    pub fn max_file_size(&self, index: u32) -> u32 {
        self.entries[index as usize].max_file_size
    }

    /// Tentatively reserves the next FAT slot for a new file: the slot claims every
    /// remaining free byte as its `max_file_size`, and nothing reaches the medium's FAT yet
    /// — only the file header itself is written, by the caller, once this returns. `number_of_files`
    /// is bumped immediately, in RAM only (spec §4.5.2 step 4: "Increment `NumberOfFiles` in RAM
    /// only; do not touch the FAT yet"), so the reserved slot is visible to `find_file` as soon as
    /// the caller writes its header — a `Stat`/`Open`/`FindFile` of the new name during the
    /// pending-creat window, before `Close`, already sees it. The real `max_file_size` is decided
    /// and persisted to the medium later, by `commit_new_slot` at `Close` (spec §4.5.3,
    /// create-reserves-tail-commits-at-close).
    pub fn reserve_slot(&mut self) -> Result<(u32, MediumAddress, u32)> {
        if self.number_of_files as usize >= MAX_FILES {
            return Err(EefsError::NoSpaceLeftOnDevice);
        }
        // Spec §4.5.2 step 3 / `eefs_fileapi.c`'s `FreeMemorySize > sizeof(EEFS_FileHeader_t)`:
        // exactly one header's worth of free space left is still a rejection, not a
        // zero-byte-payload file.
        if self.free_memory_size <= FILE_HEADER_SIZE as u32 {
            return Err(EefsError::NoSpaceLeftOnDevice);
        }
        let index = self.number_of_files;
        let header_pointer = self.free_memory_pointer;
        let tentative_max_size = self.free_memory_size - FILE_HEADER_SIZE as u32;
        // Infallible: the length check above guarantees room in the fixed-capacity vec.
        let _ = self.entries.push(InodeEntry {
            file_header_pointer: header_pointer,
            max_file_size: tentative_max_size,
        });
        self.number_of_files = index + 1;
        Ok((index, header_pointer, tentative_max_size))
    }

    /// Writes the FAT entry and, last, the FAT header back to the medium — the exact order
    /// spec §4.5.3 calls the crash-consistency boundary. Call only from `Close`, and only for
    /// a slot previously returned by `reserve_slot`. `number_of_files` was already bumped by
    /// `reserve_slot`, so this only updates the final `max_file_size` and the free-space
    /// bookkeeping before persisting both to the medium.
    pub fn commit_new_slot<M: Medium>(&mut self, medium: &mut M, index: u32, final_max_file_size: u32) {
        self.entries[index as usize].max_file_size = final_max_file_size;
        let consumed = FILE_HEADER_SIZE as u32 + final_max_file_size;
        self.free_memory_pointer = self.free_memory_pointer + consumed;
        self.free_memory_size -= consumed;

        let header_offset = self.entries[index as usize].file_header_pointer.0 - self.base.0;
        let entry = FatEntry {
            file_header_offset: header_offset,
            max_file_size: final_max_file_size,
        };
        let entry_addr = self.base + (FAT_HEADER_SIZE as u32) + index * (FAT_ENTRY_SIZE as u32);
        let mut entry_buf = [0u8; FAT_ENTRY_SIZE];
        entry
            .serialize(self.endianness, &mut entry_buf)
            .expect("entry_buf is exactly FAT_ENTRY_SIZE bytes");
        medium.write(entry_addr, &entry_buf);
        medium.flush();

        let fat_header = FatHeader {
            crc: 0,
            magic: crate::format::MAGIC,
            version: crate::format::VERSION,
            free_memory_offset: self.free_memory_pointer.0 - self.base.0,
            free_memory_size: self.free_memory_size,
            number_of_files: self.number_of_files,
        };
        let mut header_buf = [0u8; FAT_HEADER_SIZE];
        fat_header
            .serialize(self.endianness, &mut header_buf)
            .expect("header_buf is exactly FAT_HEADER_SIZE bytes");
        medium.write(self.base, &header_buf);
        medium.flush();
    }

    pub fn check_disk<M: Medium>(&self, medium: &mut M) {
        eefs_log::log!(
            "inode table: base={:#x} free_ptr={:#x} free_size={} files={}",
            self.base.0,
            self.free_memory_pointer.0,
            self.free_memory_size,
            self.number_of_files
        );
        for i in 0..self.number_of_files {
            let header = self.read_header(medium, i);
            eefs_log::log!(
                "  [{}] header={:#x} max_size={} in_use={} size={}",
                i,
                self.entries[i as usize].file_header_pointer.0,
                self.entries[i as usize].max_file_size,
                header.in_use,
                header.file_size
            );
        }
    }
}
