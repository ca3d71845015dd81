//! Assembles a manifest's entries into a single in-memory image, byte-identical to what
//! `InitFS` would mount. Grounded in `AddFile`/`OutputMemoryMap`/`ByteSwapFileSystem` in
//! `original_source/tools/geneepromfs/geneepromfs.c`, with one simplification: that source
//! builds the image in host byte order and byte-swaps it afterward if cross-compiling, because
//! its in-memory representation is a native C struct. This crate's codec has no such native
//! representation — every field is written through `WireSerialize` with an explicit
//! endianness at the call site — so there's nothing to swap after the fact; every field is
//! simply encoded directly in the target endianness as it's written.

use std::fs;
use std::io::{self, Write};

use eefs_core::config::{MAX_FILENAME_SIZE, MAX_FILES};
use eefs_core::format::{
    FatEntry, FatHeader, FileHeader, FAT_ENTRY_SIZE, FAT_HEADER_SIZE, FAT_TABLE_SIZE, FILE_HEADER_SIZE, MAGIC,
    VERSION,
};
use eefs_serialize::{Endianness, WireSerialize};

use crate::crc::calculate_crc;
use crate::manifest::ManifestEntry;

pub struct BuildOptions {
    pub eeprom_size: u32,
    pub endianness: Endianness,
    pub timestamp: u32,
    pub fill_eeprom: bool,
}

/// One row of the optional memory map. Every row carries every column; columns that don't
/// apply to a given section (`FAT`/`Free` have no slot, `Header` has no CRC) are left `None`
/// and printed empty, so the map is a single uniform table rather than the ragged per-section
/// rows `OutputMemoryMap` prints.
pub struct MapRow {
    pub offset: u32,
    pub size: u32,
    pub section: &'static str,
    pub slot: Option<u32>,
    pub filename: Option<String>,
    pub file_size: Option<u32>,
    pub spare: Option<u32>,
    pub max_size: Option<u32>,
    pub data_crc: Option<u32>,
    pub attributes: Option<u32>,
}

pub struct BuiltImage {
    pub bytes: Vec<u8>,
    pub free_memory_offset: u32,
    pub crc: u32,
    pub map: Vec<MapRow>,
}

pub fn build(entries: &[ManifestEntry], options: &BuildOptions) -> Result<BuiltImage, String> {
    if entries.len() > MAX_FILES {
        return Err(format!(
            "manifest lists {} files, which exceeds the compiled-in limit of {MAX_FILES}",
            entries.len()
        ));
    }

    let mut image = vec![0u8; options.eeprom_size as usize];
    let mut free_memory_offset = FAT_TABLE_SIZE as u32;
    let mut free_memory_size = options.eeprom_size.checked_sub(free_memory_offset).ok_or_else(|| {
        format!(
            "eeprom_size {} is smaller than the fixed FAT region ({FAT_TABLE_SIZE} bytes)",
            options.eeprom_size
        )
    })?;

    let mut map = vec![MapRow {
        offset: 0,
        size: FAT_TABLE_SIZE as u32,
        section: "FAT",
        slot: None,
        filename: None,
        file_size: None,
        spare: None,
        max_size: None,
        data_crc: None,
        attributes: None,
    }];

    for (index, entry) in entries.iter().enumerate() {
        if entries[..index].iter().any(|e| e.stored_name == entry.stored_name) {
            return Err(format!("duplicate stored name in manifest: {:?}", entry.stored_name));
        }
        if entry.stored_name.is_empty() || entry.stored_name.len() >= MAX_FILENAME_SIZE {
            return Err(format!(
                "stored name {:?} must be 1..{} bytes",
                entry.stored_name,
                MAX_FILENAME_SIZE - 1
            ));
        }

        let data = fs::read(&entry.input_path).map_err(|e| format!("reading {:?}: {e}", entry.input_path))?;
        let file_size = data.len() as u32;
        let max_file_size = round_up_4(file_size.saturating_add(entry.spare_bytes));
        let needed = FILE_HEADER_SIZE as u32 + max_file_size;

        if free_memory_size < needed {
            return Err(format!(
                "{:?} needs {needed} bytes but only {free_memory_size} remain in a {}-byte image",
                entry.stored_name, options.eeprom_size
            ));
        }

        let header_offset = free_memory_offset;
        let data_offset = header_offset + FILE_HEADER_SIZE as u32;

        let mut header = FileHeader::default();
        header.in_use = 1;
        header.attributes = entry.attributes;
        header.file_size = file_size;
        header.modification_date = options.timestamp;
        header.creation_date = options.timestamp;
        header.set_filename(entry.stored_name.as_bytes());

        let mut header_buf = [0u8; FILE_HEADER_SIZE];
        header
            .serialize(options.endianness, &mut header_buf)
            .map_err(|e| format!("encoding header for {:?}: {e:?}", entry.stored_name))?;
        write_at(&mut image, header_offset, &header_buf)?;
        write_at(&mut image, data_offset, &data)?;

        let fat_entry = FatEntry {
            file_header_offset: header_offset,
            max_file_size,
        };
        let mut entry_buf = [0u8; FAT_ENTRY_SIZE];
        fat_entry
            .serialize(options.endianness, &mut entry_buf)
            .map_err(|e| format!("encoding FAT entry for {:?}: {e:?}", entry.stored_name))?;
        let entry_addr = FAT_HEADER_SIZE as u32 + index as u32 * FAT_ENTRY_SIZE as u32;
        write_at(&mut image, entry_addr, &entry_buf)?;

        map.push(MapRow {
            offset: header_offset,
            size: FILE_HEADER_SIZE as u32,
            section: "Header",
            slot: Some(index as u32),
            filename: None,
            file_size: None,
            spare: None,
            max_size: None,
            data_crc: None,
            attributes: None,
        });
        map.push(MapRow {
            offset: data_offset,
            size: max_file_size,
            section: "Data",
            slot: Some(index as u32),
            filename: Some(entry.stored_name.clone()),
            file_size: Some(file_size),
            spare: Some(max_file_size - file_size),
            max_size: Some(max_file_size),
            data_crc: Some(calculate_crc(&data, 0) as u32),
            attributes: Some(entry.attributes),
        });

        free_memory_offset += needed;
        free_memory_size -= needed;
    }

    map.push(MapRow {
        offset: free_memory_offset,
        size: free_memory_size,
        section: "Free",
        slot: None,
        filename: None,
        file_size: None,
        spare: None,
        max_size: None,
        data_crc: None,
        attributes: None,
    });

    let fat_header = FatHeader {
        crc: 0,
        magic: MAGIC,
        version: VERSION,
        free_memory_offset,
        free_memory_size,
        number_of_files: entries.len() as u32,
    };
    let mut header_buf = [0u8; FAT_HEADER_SIZE];
    fat_header
        .serialize(options.endianness, &mut header_buf)
        .map_err(|e| format!("encoding FAT header: {e:?}"))?;
    write_at(&mut image, 0, &header_buf)?;

    // The checksum covers every byte after the CRC field, over the *entire* eeprom_size
    // buffer, including the still-zeroed tail -- matching the call site in `geneepromfs.c`,
    // which always passes the full `EEPromSize` regardless of `--fill_eeprom`.
    let crc = calculate_crc(&image[4..], 0) as u32;
    let mut crc_buf = [0u8; 4];
    crc.serialize(options.endianness, &mut crc_buf)
        .map_err(|e| format!("encoding CRC: {e:?}"))?;
    write_at(&mut image, 0, &crc_buf)?;

    if !options.fill_eeprom {
        image.truncate(free_memory_offset as usize);
    }

    Ok(BuiltImage {
        bytes: image,
        free_memory_offset,
        crc,
        map,
    })
}

pub fn write_memory_map<W: Write>(map: &[MapRow], writer: &mut W) -> io::Result<()> {
    writeln!(
        writer,
        "Offset\tSize\tSection\tSlot\tFilename\tFile Size\tSpare\tMax Size\tCrc\tAttributes"
    )?;
    for row in map {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.offset,
            row.size,
            row.section,
            opt(row.slot),
            row.filename.as_deref().unwrap_or(""),
            opt(row.file_size),
            opt(row.spare),
            opt(row.max_size),
            row.data_crc.map(|c| format!("0x{c:08X}")).unwrap_or_default(),
            opt(row.attributes),
        )?;
    }
    Ok(())
}

fn opt(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_at(image: &mut [u8], offset: u32, bytes: &[u8]) -> Result<(), String> {
    let start = offset as usize;
    let end = start + bytes.len();
    image
        .get_mut(start..end)
        .ok_or_else(|| format!("internal error: write of {} bytes at offset {offset} falls outside the image", bytes.len()))?
        .copy_from_slice(bytes);
    Ok(())
}

fn round_up_4(value: u32) -> u32 {
    (value + 3) & !3
}

#[cfg(test)]
mod tests {
    use super::*;
    use eefs_core::format::ATTRIBUTE_NONE;
    use std::io::Cursor;

    fn write_temp(name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("eefs-imgbuilder-test-{name}-{}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn builds_a_minimal_single_file_image_and_truncates_by_default() {
        let path = write_temp("a", b"hello");
        let entries = vec![ManifestEntry {
            input_path: path.to_string_lossy().into_owned(),
            stored_name: "a.dat".into(),
            spare_bytes: 0,
            attributes: ATTRIBUTE_NONE,
        }];
        let options = BuildOptions {
            eeprom_size: 4096,
            endianness: Endianness::Big,
            timestamp: 1000,
            fill_eeprom: false,
        };

        let image = build(&entries, &options).unwrap();
        assert_eq!(image.bytes.len(), image.free_memory_offset as usize);
        assert!(image.bytes.len() < 4096);

        let (header, _) =
            <FatHeader as eefs_serialize::WireDeserialize>::deserialize(Endianness::Big, &image.bytes).unwrap();
        assert!(header.is_valid());
        assert_eq!(header.number_of_files, 1);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn fill_eeprom_pads_to_the_full_size() {
        let path = write_temp("b", b"x");
        let entries = vec![ManifestEntry {
            input_path: path.to_string_lossy().into_owned(),
            stored_name: "b.dat".into(),
            spare_bytes: 0,
            attributes: ATTRIBUTE_NONE,
        }];
        let options = BuildOptions {
            eeprom_size: 4096,
            endianness: Endianness::Little,
            timestamp: 0,
            fill_eeprom: true,
        };

        let image = build(&entries, &options).unwrap();
        assert_eq!(image.bytes.len(), 4096);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn duplicate_stored_names_are_rejected() {
        let path = write_temp("c", b"x");
        let entries = vec![
            ManifestEntry {
                input_path: path.to_string_lossy().into_owned(),
                stored_name: "dup.dat".into(),
                spare_bytes: 0,
                attributes: ATTRIBUTE_NONE,
            },
            ManifestEntry {
                input_path: path.to_string_lossy().into_owned(),
                stored_name: "dup.dat".into(),
                spare_bytes: 0,
                attributes: ATTRIBUTE_NONE,
            },
        ];
        let options = BuildOptions {
            eeprom_size: 4096,
            endianness: Endianness::Big,
            timestamp: 0,
            fill_eeprom: false,
        };

        assert!(build(&entries, &options).is_err());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn an_image_too_small_for_the_fat_region_is_rejected() {
        let options = BuildOptions {
            eeprom_size: 16,
            endianness: Endianness::Big,
            timestamp: 0,
            fill_eeprom: false,
        };
        assert!(build(&[], &options).is_err());
    }

    #[test]
    fn memory_map_has_a_header_row_and_one_row_per_section() {
        let path = write_temp("d", b"abcd");
        let entries = vec![ManifestEntry {
            input_path: path.to_string_lossy().into_owned(),
            stored_name: "d.dat".into(),
            spare_bytes: 4,
            attributes: ATTRIBUTE_NONE,
        }];
        let options = BuildOptions {
            eeprom_size: 4096,
            endianness: Endianness::Big,
            timestamp: 0,
            fill_eeprom: false,
        };
        let image = build(&entries, &options).unwrap();

        let mut out = Cursor::new(Vec::new());
        write_memory_map(&image.map, &mut out).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        // header + FAT + Header + Data + Free
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("Offset\tSize\tSection"));
        assert!(lines[3].contains("d.dat"));

        let _ = fs::remove_file(&path);
    }
}
