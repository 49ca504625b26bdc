//! single-entry and whole-archive extraction (spec §4.6)

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::entry::{Archive, DirEntry, Warning};
use crate::error::{Error, Result};
use crate::name::{hex_encode, resolve_collision, validate_name, NameMode};
use crate::validate::ValidationMode;

const COPY_BUF_SIZE: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    Overwrite,
    Rename,
}

/// which entry `extract_one` should pull out of the archive.
#[derive(Debug, Clone)]
pub enum Selector<'a> {
    Index(usize),
    Name(&'a str),
}

/// a byte window overriding the entry's own directory-declared offset/size,
/// used to recover files whose directory entry is suspect but whose data
/// is intact (spec §4.6).
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomWindow {
    pub offset: Option<u64>,
    pub size: Option<u64>,
}

/// resolves an entry's on-disk filename from its archive name, per §4.2:
/// hex-encode raw bytes in hex mode, otherwise use the name as-is (already
/// policy-checked at decode time for non-hex modes).
pub fn resolved_filename(entry: &DirEntry, name_mode: NameMode) -> String {
    match name_mode {
        NameMode::Hex => hex_encode(&entry.name),
        _ => String::from_utf8_lossy(&entry.name).into_owned(),
    }
}

/// opens `path` for writing, honoring `overwrite`. When every rename
/// candidate is also taken, whole-archive extraction treats it as a
/// skip-with-warning (`hard_fail: false`); a single targeted extraction
/// treats it as `Error::Collision` instead, since there's no remaining
/// entry for the caller to fall back to.
fn open_output(
    path: &Path,
    overwrite: OverwritePolicy,
    hard_fail: bool,
    warnings: &mut Vec<Warning>,
) -> Result<Option<(File, PathBuf)>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    if !path.exists() {
        return Ok(Some((File::create(path)?, path.to_path_buf())));
    }

    match overwrite {
        OverwritePolicy::Overwrite => {
            log::warn!("overwriting existing file {}", path.display());
            Ok(Some((File::create(path)?, path.to_path_buf())))
        }
        OverwritePolicy::Rename => match resolve_collision(path) {
            Some(renamed) => Ok(Some((File::create(&renamed)?, renamed))),
            None if hard_fail => Err(Error::Collision(path.to_path_buf())),
            None => {
                warnings.push(Warning::OutputCollisionSkipped {
                    path: path.to_path_buf(),
                });
                Ok(None)
            }
        },
    }
}

fn stream_window<R: Read + Seek, W: Write>(
    source: &mut R,
    out: &mut W,
    offset: u64,
    size: u64,
) -> std::io::Result<()> {
    source.seek(SeekFrom::Start(offset))?;
    let mut remaining = size;
    let mut buf = [0u8; COPY_BUF_SIZE];
    while remaining > 0 {
        let want = (buf.len() as u64).min(remaining) as usize;
        source.read_exact(&mut buf[..want])?;
        out.write_all(&buf[..want])?;
        remaining -= want as u64;
    }
    Ok(())
}

/// extracts every entry in directory order into `out_dir`. Returns the
/// collected warnings. In `ValidationMode::Strict`, the first per-entry
/// failure aborts the whole operation; in `Lenient`, failures are recorded
/// as warnings and extraction continues.
pub fn extract_all<R: Read + Seek>(
    archive: &Archive,
    source: &mut R,
    out_dir: &Path,
    name_mode: NameMode,
    overwrite: OverwritePolicy,
    mode: ValidationMode,
) -> Result<Vec<Warning>> {
    let mut warnings = Vec::new();
    fs::create_dir_all(out_dir)?;

    for entry in &archive.entries {
        match extract_entry_to_dir(entry, source, out_dir, name_mode, overwrite, &mut warnings) {
            Ok(()) => {}
            Err(e) if mode == ValidationMode::Lenient => {
                log::warn!("skipping entry: {e}");
                warnings.push(Warning::NameRejected {
                    index: 0,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(warnings)
}

fn extract_entry_to_dir<R: Read + Seek>(
    entry: &DirEntry,
    source: &mut R,
    out_dir: &Path,
    name_mode: NameMode,
    overwrite: OverwritePolicy,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    if name_mode != NameMode::Hex {
        validate_name(&entry.name, name_mode, None)?;
    }

    let filename = resolved_filename(entry, name_mode);
    let out_path = out_dir.join(filename);

    let Some((mut file, _final_path)) = open_output(&out_path, overwrite, false, warnings)? else {
        return Ok(());
    };

    stream_window(source, &mut file, entry.offset as u64, entry.size as u64)?;
    Ok(())
}

/// extracts one entry, selected by 1-based index or (case-sensitive) name.
/// If both are available to the caller, name wins (spec §4.6).
pub fn extract_one<R: Read + Seek>(
    archive: &Archive,
    source: &mut R,
    out_dir: &Path,
    selector: Selector<'_>,
    name_mode: NameMode,
    overwrite: OverwritePolicy,
    custom: CustomWindow,
) -> Result<Vec<Warning>> {
    let entry = match selector {
        Selector::Name(name) => archive
            .entries
            .iter()
            .find(|e| resolved_filename(e, name_mode) == name)
            .ok_or_else(|| Error::EntryNotFound(format!("no entry named {name:?}")))?,
        Selector::Index(idx) => {
            if idx == 0 || idx > archive.entries.len() {
                return Err(Error::EntryNotFound(format!(
                    "index {idx} is out of range (archive has {} entries)",
                    archive.entries.len()
                )));
            }
            &archive.entries[idx - 1]
        }
    };

    let mut warnings = Vec::new();

    if name_mode != NameMode::Hex {
        validate_name(&entry.name, name_mode, None)?;
    }

    let filename = resolved_filename(entry, name_mode);
    let out_path = out_dir.join(filename);

    fs::create_dir_all(out_dir)?;
    let (mut file, _final_path) = match open_output(&out_path, overwrite, true, &mut warnings)? {
        Some(opened) => opened,
        None => unreachable!("hard_fail requests a Collision error instead of Ok(None)"),
    };

    let offset = custom.offset.unwrap_or(entry.offset as u64);
    let size = custom.size.unwrap_or(entry.size as u64);

    if offset + size > archive.file_size {
        return Err(Error::EntryNotFound(format!(
            "requested window {offset}..{} exceeds archive size {}",
            offset + size,
            archive.file_size
        )));
    }

    stream_window(source, &mut file, offset, size)?;
    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;
    use std::io::Cursor;

    fn archive_with(entries: Vec<DirEntry>, file_size: u64) -> Archive {
        Archive {
            format: Format::BigF,
            file_size,
            declared_archive_size: Some(file_size),
            declared_header_size: Some(16),
            declared_entry_count: entries.len() as u64,
            observed_entry_count: entries.len() as u64,
            entries,
        }
    }

    #[test]
    fn extracts_all_entries_to_disk() {
        let body = b"helloABCD".to_vec();
        let archive = archive_with(
            vec![
                DirEntry {
                    offset: 0,
                    size: 5,
                    name_file_offset: 0,
                    name: b"A.txt".to_vec(),
                },
                DirEntry {
                    offset: 5,
                    size: 4,
                    name_file_offset: 0,
                    name: b"B.bin".to_vec(),
                },
            ],
            body.len() as u64,
        );

        let dir = std::env::temp_dir().join(format!("viv-extract-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut reader = Cursor::new(body);
        let warnings = extract_all(
            &archive,
            &mut reader,
            &dir,
            NameMode::Default,
            OverwritePolicy::Overwrite,
            ValidationMode::Lenient,
        )
        .unwrap();

        assert!(warnings.is_empty());
        assert_eq!(std::fs::read(dir.join("A.txt")).unwrap(), b"hello");
        assert_eq!(std::fs::read(dir.join("B.bin")).unwrap(), b"ABCD");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn custom_window_overrides_directory_values() {
        let body = b"0123456789".to_vec();
        let archive = archive_with(
            vec![DirEntry {
                offset: 0,
                size: 1,
                name_file_offset: 0,
                name: b"f".to_vec(),
            }],
            body.len() as u64,
        );

        let dir = std::env::temp_dir().join(format!("viv-extract-window-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut reader = Cursor::new(body);
        extract_one(
            &archive,
            &mut reader,
            &dir,
            Selector::Index(1),
            NameMode::Default,
            OverwritePolicy::Overwrite,
            CustomWindow {
                offset: Some(2),
                size: Some(4),
            },
        )
        .unwrap();

        assert_eq!(std::fs::read(dir.join("f")).unwrap(), b"2345");
        std::fs::remove_dir_all(&dir).ok();
    }
}
