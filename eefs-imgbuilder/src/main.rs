//! CLI front end for the offline image builder: reads a manifest, assembles an EEFS volume
//! image, and optionally emits a memory map. Grounded in
//! `original_source/tools/geneepromfs/{geneepromfs,cmdlineopt}.c` for the flag surface and
//! exit-code convention (0 on success, 1 on any parse or I/O error), and in
//! `maestro-os-maestro-utils/mkfs/src/main.rs` for the hand-rolled
//! `Result<(), String>` + `eprintln!`/`exit` error-handling shape used throughout this binary.

mod builder;
mod crc;
mod manifest;

use std::fs;
use std::path::PathBuf;
use std::process::exit;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use eefs_serialize::Endianness;

/// Build an EEPROM File System image from a manifest of host files.
#[derive(Parser)]
#[command(name = "eefs-imgbuilder", version, about, long_about = None)]
struct Cli {
    /// Manifest listing the files to add to the image
    input_file: PathBuf,

    /// Path to write the assembled image to
    output_file: PathBuf,

    /// Output byte order
    #[arg(long, value_enum, default_value_t = EndianArg::Big)]
    endian: EndianArg,

    /// Size of the target EEPROM, in bytes (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_size, default_value = "0x200000")]
    eeprom_size: u32,

    /// Fixed timestamp to stamp every file with, for reproducible images; defaults to now
    #[arg(long)]
    time: Option<u32>,

    /// Pad the output to the full eeprom_size instead of truncating to the used prefix
    #[arg(long)]
    fill_eeprom: bool,

    /// Write a tab-separated memory map to this path
    #[arg(long)]
    map: Option<PathBuf>,

    /// Print the name of each file as it's added
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum EndianArg {
    Big,
    Little,
}

impl std::fmt::Display for EndianArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EndianArg::Big => "big",
            EndianArg::Little => "little",
        })
    }
}

fn parse_size(raw: &str) -> Result<u32, String> {
    let raw = raw.trim();
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        raw.parse().map_err(|e: std::num::ParseIntError| e.to_string())
    }
}

fn main() {
    let cli = Cli::parse();
    run(&cli).unwrap_or_else(|message| {
        eprintln!("eefs-imgbuilder: {message}");
        exit(1);
    });
}

fn run(cli: &Cli) -> Result<(), String> {
    let manifest_text = fs::read_to_string(&cli.input_file).map_err(|e| format!("reading {:?}: {e}", cli.input_file))?;
    let entries = manifest::parse(&manifest_text)?;

    let endianness = match cli.endian {
        EndianArg::Big => Endianness::Big,
        EndianArg::Little => Endianness::Little,
    };
    let timestamp = cli.time.unwrap_or_else(now_unix);

    if cli.verbose {
        for entry in &entries {
            eprintln!("adding {} as {}", entry.input_path, entry.stored_name);
        }
    }

    let options = builder::BuildOptions {
        eeprom_size: cli.eeprom_size,
        endianness,
        timestamp,
        fill_eeprom: cli.fill_eeprom,
    };
    let image = builder::build(&entries, &options)?;

    fs::write(&cli.output_file, &image.bytes).map_err(|e| format!("writing {:?}: {e}", cli.output_file))?;

    if let Some(map_path) = &cli.map {
        let mut file = fs::File::create(map_path).map_err(|e| format!("creating {map_path:?}: {e}"))?;
        builder::write_memory_map(&image.map, &mut file).map_err(|e| format!("writing {map_path:?}: {e}"))?;
    }

    if cli.verbose {
        let utilization = (image.free_memory_offset as f64 / cli.eeprom_size as f64) * 100.0;
        eprintln!("files added: {}", entries.len());
        eprintln!("eeprom size: {}", cli.eeprom_size);
        eprintln!("allocated:   {}", image.free_memory_offset);
        eprintln!("utilization: {utilization:.0}%");
        eprintln!("image checksum: 0x{:08x}", image.crc);
    }

    Ok(())
}

fn now_unix() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}
