//! archive encoder (spec §4.7)
//!
//! builds a brand-new BIGF-family or C0FB archive from a list of input
//! files on disk. the result is re-decoded through the same header/walker/
//! validator pipeline used for reads before it's handed back, so an
//! archive this module produces is guaranteed to be one the engine can
//! also read back.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::codec::{write_u16_be, write_u24_be, write_u32_be};
use crate::entry::{Archive, DirEntry, Warning};
use crate::error::{Error, Result};
use crate::format::Format;
use crate::header::HeaderInfo;
use crate::name::{validate_name, NameMode};
use crate::validate::{self, ValidationMode};
use crate::walker::WalkResult;

const BIGF_HEADER_LEN: u64 = 16;
const C0FB_HEADER_LEN: u64 = 6;
const COPY_BUF_SIZE: usize = 8192;

/// one file to be packed, in the order it should appear in the directory.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// overrides the name derived from `path`'s file name, letting a caller
    /// supply a hex-mode raw name that isn't a legal filesystem name.
    pub archive_name: Option<Vec<u8>>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            archive_name: None,
        }
    }
}

fn round_up(x: u64, alignment: u32) -> u64 {
    if alignment == 0 {
        return x;
    }
    let a = alignment as u64;
    (x + a - 1) / a * a
}

fn derive_name(source: &SourceFile, name_mode: NameMode) -> Result<Vec<u8>> {
    if let Some(name) = &source.archive_name {
        validate_name(name, name_mode, None)?;
        return Ok(name.clone());
    }

    let file_name = source.path.file_name().ok_or_else(|| {
        Error::NameInvalid(format!("{} has no file name component", source.path.display()))
    })?;

    #[cfg(unix)]
    let bytes = {
        use std::os::unix::ffi::OsStrExt;
        file_name.as_bytes().to_vec()
    };
    #[cfg(not(unix))]
    let bytes = file_name.to_string_lossy().into_owned().into_bytes();

    validate_name(&bytes, name_mode, None)?;
    Ok(bytes)
}

/// encodes `sources` into `format`, writing the whole archive to `out`.
/// a file that can't be opened or stat'd is skipped with a `Warning`
/// rather than aborting the whole encode. a duplicate archive name is a
/// hard error: the directory would be ambiguous to decode.
pub fn encode<W: Write>(
    format: Format,
    sources: &[SourceFile],
    name_mode: NameMode,
    alignment: u32,
    dir_entry_len_fixed: Option<u32>,
    out: &mut W,
) -> Result<(Archive, Vec<Warning>)> {
    let mut warnings = Vec::new();
    let mut planned: Vec<(Vec<u8>, u64, PathBuf)> = Vec::new();

    for source in sources {
        let meta = match std::fs::metadata(&source.path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => {
                warnings.push(Warning::PathSkipped {
                    path: source.path.clone(),
                    reason: "not a regular file".into(),
                });
                continue;
            }
            Err(e) => {
                warnings.push(Warning::PathSkipped {
                    path: source.path.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let name = match derive_name(source, name_mode) {
            Ok(name) => name,
            Err(e) => {
                warnings.push(Warning::PathSkipped {
                    path: source.path.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if planned.iter().any(|(n, _, _)| n == &name) {
            return Err(Error::NameInvalid(format!(
                "duplicate archive name {:?}",
                String::from_utf8_lossy(&name)
            )));
        }

        planned.push((name, meta.len(), source.path.clone()));
    }

    let header_len = if format.is_bigf_family() {
        BIGF_HEADER_LEN
    } else {
        C0FB_HEADER_LEN
    };
    let prefix_len = format.offset_width() as u64 * 2;

    if let Some(fixed_len) = dir_entry_len_fixed {
        if fixed_len < 10 {
            return Err(Error::NameInvalid(
                "fixed directory entry length must be at least 10 bytes".into(),
            ));
        }
        let name_region_len = (fixed_len as u64).saturating_sub(prefix_len);
        if let Some((name, _, path)) = planned.iter().find(|(n, _, _)| n.len() as u64 >= name_region_len) {
            return Err(Error::NameInvalid(format!(
                "{:?} ({:?}) does not fit in a {fixed_len}-byte fixed directory entry",
                path, String::from_utf8_lossy(name)
            )));
        }
    }

    let per_entry_len = |name_len: u64| match dir_entry_len_fixed {
        Some(fixed_len) => fixed_len as u64,
        None => prefix_len + name_len + 1,
    };

    let directory_len: u64 = planned
        .iter()
        .map(|(name, _, _)| per_entry_len(name.len() as u64))
        .sum();

    let mut offsets = Vec::with_capacity(planned.len());
    let mut cursor = round_up(header_len + directory_len, alignment);
    for (_, size, _) in &planned {
        offsets.push(cursor);
        cursor += size;
        cursor = round_up(cursor, alignment);
    }
    let archive_size = if planned.is_empty() {
        header_len + directory_len
    } else {
        offsets.last().copied().unwrap() + planned.last().unwrap().1
    };

    let mut directory = Vec::with_capacity(directory_len as usize);
    for ((name, size, _), offset) in planned.iter().zip(&offsets) {
        if format.is_bigf_family() {
            write_u32_be(&mut directory, *offset as u32);
            write_u32_be(&mut directory, *size as u32);
        } else {
            write_u24_be(&mut directory, *offset as u32);
            write_u24_be(&mut directory, *size as u32);
        }
        directory.extend_from_slice(name);
        match dir_entry_len_fixed {
            Some(fixed_len) => {
                let region_len = (fixed_len as u64).saturating_sub(prefix_len) as usize;
                directory.resize(directory.len() + (region_len - name.len()), 0);
            }
            None => directory.push(0),
        }
    }

    write_header(out, format, archive_size, planned.len() as u64, header_len + directory_len)?;
    out.write_all(&directory)?;

    let mut written = header_len + directory_len;
    for ((_, size, path), offset) in planned.iter().zip(&offsets) {
        if *offset > written {
            write_zeros(out, *offset - written)?;
            written = *offset;
        }
        stream_file_into(path, out)?;
        written += size;
    }
    if archive_size > written {
        write_zeros(out, archive_size - written)?;
    }

    let entries: Vec<DirEntry> = planned
        .into_iter()
        .zip(offsets)
        .map(|((name, size, _), offset)| DirEntry {
            offset: offset as u32,
            size: size as u32,
            name_file_offset: 0,
            name,
        })
        .collect();
    let observed_entry_count = entries.len() as u64;

    let header = HeaderInfo {
        format,
        declared_archive_size: if format.is_bigf_family() {
            Some(archive_size)
        } else {
            None
        },
        declared_header_size: if format.is_bigf_family() {
            Some(header_len + directory_len)
        } else {
            None
        },
        declared_entry_count: observed_entry_count,
        directory_start: header_len,
    };
    let walk = WalkResult {
        entries,
        observed_entry_count,
        directory_end: header_len + directory_len,
    };

    let (archive, validation_warnings) =
        validate::validate(header, walk, archive_size, ValidationMode::Strict)?;
    debug_assert!(
        validation_warnings.is_empty(),
        "an archive this module just built should never trip its own validator"
    );

    Ok((archive, warnings))
}

fn write_header<W: Write>(
    out: &mut W,
    format: Format,
    archive_size: u64,
    entry_count: u64,
    header_size: u64,
) -> Result<()> {
    let mut head = Vec::new();
    if format.is_bigf_family() {
        head.extend_from_slice(format.ascii_magic().expect("bigf-family always has an ascii magic"));
        write_u32_be(&mut head, archive_size as u32);
        write_u32_be(&mut head, entry_count as u32);
        write_u32_be(&mut head, header_size as u32);
    } else {
        head.extend_from_slice(&[0xC0, 0xFB, 0x00, 0x80]);
        write_u16_be(&mut head, entry_count as u16);
    }
    out.write_all(&head)?;
    Ok(())
}

fn write_zeros<W: Write>(out: &mut W, mut n: u64) -> Result<()> {
    let zeros = [0u8; COPY_BUF_SIZE];
    while n > 0 {
        let chunk = (zeros.len() as u64).min(n) as usize;
        out.write_all(&zeros[..chunk])?;
        n -= chunk as u64;
    }
    Ok(())
}

fn stream_file_into<W: Write>(path: &Path, out: &mut W) -> Result<()> {
    let mut file = File::open(path)?;
    let mut buf = [0u8; COPY_BUF_SIZE];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        out.write_all(&buf[..read])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn write_temp(contents: &[u8]) -> PathBuf {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "viv-encode-test-{}-{n}",
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn encodes_and_self_validates_bigf() {
        let a = write_temp(b"hello");
        let b = write_temp(b"world!!");

        let sources = vec![SourceFile::new(&a), SourceFile::new(&b)];
        let mut out = Cursor::new(Vec::new());
        let (archive, warnings) =
            encode(Format::BigF, &sources, NameMode::Default, 0, None, &mut out).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(archive.entries.len(), 2);
        assert_eq!(out.get_ref()[..4], *b"BIGF");

        std::fs::remove_file(a).ok();
        std::fs::remove_file(b).ok();
    }

    #[test]
    fn skips_missing_input_with_warning() {
        let a = write_temp(b"present");
        let missing = std::env::temp_dir().join("viv-encode-does-not-exist-xyz");

        let sources = vec![SourceFile::new(&a), SourceFile::new(&missing)];
        let mut out = Cursor::new(Vec::new());
        let (archive, warnings) =
            encode(Format::BigF, &sources, NameMode::Default, 0, None, &mut out).unwrap();

        assert_eq!(archive.entries.len(), 1);
        assert_eq!(warnings.len(), 1);

        std::fs::remove_file(a).ok();
    }

    #[test]
    fn rejects_duplicate_names() {
        let a = write_temp(b"one");
        let mut sources = vec![SourceFile::new(&a)];
        sources.push(SourceFile {
            path: a.clone(),
            archive_name: None,
        });

        let mut out = Cursor::new(Vec::new());
        let err = encode(Format::BigF, &sources, NameMode::Default, 0, None, &mut out).unwrap_err();
        assert!(matches!(err, Error::NameInvalid(_)));

        std::fs::remove_file(a).ok();
    }

    #[test]
    fn aligns_offsets_when_requested() {
        let a = write_temp(b"x");
        let b = write_temp(b"y");
        let sources = vec![SourceFile::new(&a), SourceFile::new(&b)];

        let mut out = Cursor::new(Vec::new());
        let (archive, _) = encode(Format::BigF, &sources, NameMode::Default, 16, None, &mut out).unwrap();

        for entry in &archive.entries {
            assert_eq!(entry.offset % 16, 0);
        }

        std::fs::remove_file(a).ok();
        std::fs::remove_file(b).ok();
    }
}
