//! Parses the manifest grammar: a list of records separated by `;`, each record four fields
//! separated by `,` — input path, stored name, spare bytes, attributes (`None` | `ReadOnly`).
//! `!` starts a comment that runs to end of line. Grounded in the tokenizer of
//! `original_source/tools/geneepromfs/parser.c`, simplified to the four-field grammar and the
//! `None`/`ReadOnly` attribute spelling this tool's manifests use.

use eefs_core::format::{ATTRIBUTE_NONE, ATTRIBUTE_READONLY};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub input_path: String,
    pub stored_name: String,
    pub spare_bytes: u32,
    pub attributes: u32,
}

/// Parses the full manifest text, returning one entry per record in file order.
pub fn parse(text: &str) -> Result<Vec<ManifestEntry>, String> {
    let mut entries = Vec::new();
    let mut record = String::new();
    let mut line: u32 = 1;
    let mut record_start_line: u32 = 1;
    let mut in_comment = false;

    for ch in text.chars() {
        match ch {
            '\n' => {
                line += 1;
                in_comment = false;
                record.push(' ');
            }
            '!' => in_comment = true,
            _ if in_comment => {}
            ';' => {
                parse_record(&record, record_start_line, &mut entries)?;
                record.clear();
                record_start_line = line;
            }
            other => record.push(other),
        }
    }

    if !record.trim().is_empty() {
        return Err(format!(
            "line {record_start_line}: manifest ends with an unterminated record (missing trailing ';'): {:?}",
            record.trim()
        ));
    }

    Ok(entries)
}

fn parse_record(record: &str, line: u32, entries: &mut Vec<ManifestEntry>) -> Result<(), String> {
    let trimmed = record.trim();
    if trimmed.is_empty() {
        return Ok(());
    }

    let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
    if fields.len() != 4 {
        return Err(format!(
            "line {line}: expected 4 comma-separated fields (input path, stored name, spare bytes, attributes), found {}: {trimmed:?}",
            fields.len()
        ));
    }

    let input_path = fields[0];
    let stored_name = fields[1];
    if input_path.is_empty() {
        return Err(format!("line {line}: input path must not be empty"));
    }
    if stored_name.is_empty() {
        return Err(format!("line {line}: stored name must not be empty"));
    }

    let spare_bytes = parse_u32(fields[2])
        .ok_or_else(|| format!("line {line}: invalid spare byte count: {:?}", fields[2]))?;

    let attributes = match fields[3] {
        "None" => ATTRIBUTE_NONE,
        "ReadOnly" => ATTRIBUTE_READONLY,
        other => {
            return Err(format!(
                "line {line}: invalid attribute {other:?}, expected \"None\" or \"ReadOnly\""
            ))
        }
    };

    entries.push(ManifestEntry {
        input_path: input_path.to_string(),
        stored_name: stored_name.to_string(),
        spare_bytes,
        attributes,
    });
    Ok(())
}

/// Decimal, or `0x`/`0X`-prefixed hex — the two bases `geneepromfs`'s own `strtoul(..., 0)`
/// call accepts that a flight-software manifest author would plausibly reach for.
fn parse_u32(field: &str) -> Option<u32> {
    if let Some(hex) = field.strip_prefix("0x").or_else(|| field.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        field.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_records_with_comments_and_whitespace() {
        let text = "
            ! sample manifest
            data/boot.bin, boot.bin, 0, None; ! the boot image
            data/cfg.dat,  cfg.dat,  0x10, ReadOnly;
        ";
        let entries = parse(text).unwrap();
        assert_eq!(
            entries,
            vec![
                ManifestEntry {
                    input_path: "data/boot.bin".into(),
                    stored_name: "boot.bin".into(),
                    spare_bytes: 0,
                    attributes: ATTRIBUTE_NONE,
                },
                ManifestEntry {
                    input_path: "data/cfg.dat".into(),
                    stored_name: "cfg.dat".into(),
                    spare_bytes: 16,
                    attributes: ATTRIBUTE_READONLY,
                },
            ]
        );
    }

    #[test]
    fn rejects_a_record_with_the_wrong_field_count() {
        assert!(parse("a.dat, a.dat, 0;").is_err());
        assert!(parse("a.dat, a.dat, 0, None, extra;").is_err());
    }

    #[test]
    fn rejects_an_unknown_attribute() {
        assert!(parse("a.dat, a.dat, 0, Hidden;").is_err());
    }

    #[test]
    fn rejects_an_unterminated_trailing_record() {
        assert!(parse("a.dat, a.dat, 0, None").is_err());
    }

    #[test]
    fn a_trailing_semicolon_with_nothing_after_it_is_fine() {
        assert!(parse("a.dat, a.dat, 0, None;   ").is_ok());
    }
}
