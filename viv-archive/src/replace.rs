//! single-entry in-place replacement (spec §4.8)
//!
//! decodes the existing archive leniently, substitutes one entry's body
//! with the contents of a new file, and rebuilds the directory around it.
//! the rebuilt archive is streamed to a sibling temp file and only moved
//! over the original once it's fully written, so a crash mid-replace never
//! leaves a half-written archive at the destination path.

use std::fs::{self, File};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::codec::{write_u16_be, write_u24_be, write_u32_be};
use crate::entry::{Archive, DirEntry, Warning};
use crate::error::{Error, Result};
use crate::format::Format;
use crate::header::read_header;
use crate::validate::{validate, ValidationMode};
use crate::walker::walk_directory;
use crate::name::NameMode;

const COPY_BUF_SIZE: usize = 8192;
const BIGF_HEADER_LEN: u64 = 16;
const C0FB_HEADER_LEN: u64 = 6;

fn round_up(x: u64, alignment: u32) -> u64 {
    if alignment == 0 {
        return x;
    }
    let a = alignment as u64;
    (x + a - 1) / a * a
}

/// replaces the entry named `target_name` (matched case-sensitively
/// against the archive's stored raw name bytes) with the contents of
/// `replacement_path`, writing the rebuilt archive to `archive_path`.
///
/// `target_name` is raw bytes rather than `&str` so hex-mode archives,
/// whose stored names aren't necessarily valid UTF-8, can be matched too.
///
/// alignment is preserved unless `alignment_override` is given: the
/// engine infers it from the existing archive's entry offsets
/// (`Archive::inferred_alignment`) rather than trusting a caller-supplied
/// value that might not match how the archive was actually built.
pub fn replace(
    archive_path: &Path,
    target_name: &[u8],
    replacement_path: &Path,
    alignment_override: Option<u32>,
) -> Result<(Archive, Vec<Warning>)> {
    let mut source = File::open(archive_path)?;
    let file_size = source.metadata()?.len();

    let header = read_header(&mut source, file_size)?;
    let walk = walk_directory(&mut source, &header, None, NameMode::Default)?;
    let (old_archive, warnings) =
        validate(header, walk, file_size, ValidationMode::Lenient)?;

    let target_index = old_archive
        .entries
        .iter()
        .position(|e| e.name == target_name)
        .ok_or_else(|| {
            Error::EntryNotFound(format!(
                "no entry named {:?}",
                String::from_utf8_lossy(target_name)
            ))
        })?;

    let replacement_size = fs::metadata(replacement_path)?.len();
    let alignment = alignment_override.unwrap_or_else(|| old_archive.inferred_alignment());

    let format = old_archive.format;
    let header_len = if format.is_bigf_family() {
        BIGF_HEADER_LEN
    } else {
        C0FB_HEADER_LEN
    };
    let prefix_len = format.offset_width() as u64 * 2;
    let directory_len: u64 = old_archive
        .entries
        .iter()
        .map(|e| prefix_len + e.name.len() as u64 + 1)
        .sum();

    let mut new_entries = Vec::with_capacity(old_archive.entries.len());
    let mut cursor = round_up(header_len + directory_len, alignment);
    for (i, old) in old_archive.entries.iter().enumerate() {
        let size = if i == target_index {
            replacement_size
        } else {
            old.size as u64
        };
        let offset = cursor;
        cursor = round_up(cursor + size, alignment);
        new_entries.push(DirEntry {
            offset: offset as u32,
            size: size as u32,
            name_file_offset: 0,
            name: old.name.clone(),
        });
    }
    let archive_size = new_entries
        .last()
        .map(|e| e.end())
        .unwrap_or(header_len + directory_len);

    let tmp_path = sibling_temp_path(archive_path);
    {
        let mut out = File::create(&tmp_path)?;
        write_header(&mut out, format, archive_size, new_entries.len() as u64, header_len + directory_len)?;

        let mut directory = Vec::with_capacity(directory_len as usize);
        for entry in &new_entries {
            if format.is_bigf_family() {
                write_u32_be(&mut directory, entry.offset);
                write_u32_be(&mut directory, entry.size);
            } else {
                write_u24_be(&mut directory, entry.offset);
                write_u24_be(&mut directory, entry.size);
            }
            directory.extend_from_slice(&entry.name);
            directory.push(0);
        }
        out.write_all(&directory)?;

        let mut written = header_len + directory_len;
        let mut source_reader = BufReader::new(&mut source);
        for (i, (old, new)) in old_archive.entries.iter().zip(&new_entries).enumerate() {
            if new.offset as u64 > written {
                write_zeros(&mut out, new.offset as u64 - written)?;
                written = new.offset as u64;
            }
            if i == target_index {
                let mut replacement = File::open(replacement_path)?;
                stream(&mut replacement, &mut out)?;
            } else {
                source_reader.seek(SeekFrom::Start(old.offset as u64))?;
                copy_exact(&mut source_reader, &mut out, old.size as u64)?;
            }
            written += new.size as u64;
        }
    }

    fs::rename(&tmp_path, archive_path)?;

    let new_archive = Archive {
        format,
        file_size: archive_size,
        declared_archive_size: if format.is_bigf_family() {
            Some(archive_size)
        } else {
            None
        },
        declared_header_size: Some(header_len + directory_len),
        declared_entry_count: new_entries.len() as u64,
        observed_entry_count: new_entries.len() as u64,
        entries: new_entries,
    };

    Ok((new_archive, warnings))
}

fn sibling_temp_path(archive_path: &Path) -> PathBuf {
    let mut name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    name.push_str(".viv-replace.tmp");
    archive_path.with_file_name(name)
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

fn stream<R: Read, W: Write>(src: &mut R, out: &mut W) -> Result<()> {
    let mut buf = [0u8; COPY_BUF_SIZE];
    loop {
        let read = src.read(&mut buf)?;
        if read == 0 {
            break;
        }
        out.write_all(&buf[..read])?;
    }
    Ok(())
}

fn copy_exact<R: Read, W: Write>(src: &mut R, out: &mut W, mut n: u64) -> Result<()> {
    let mut buf = [0u8; COPY_BUF_SIZE];
    while n > 0 {
        let want = (buf.len() as u64).min(n) as usize;
        src.read_exact(&mut buf[..want])?;
        out.write_all(&buf[..want])?;
        n -= want as u64;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{encode, SourceFile};
    use std::io::Cursor;

    fn write_temp(contents: &[u8]) -> PathBuf {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!("viv-replace-test-{}-{n}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn replaces_entry_and_preserves_alignment() {
        let a = write_temp(b"aaaa");
        let b = write_temp(b"bb");
        let archive_path = std::env::temp_dir().join(format!(
            "viv-replace-archive-{}.viv",
            std::process::id()
        ));

        {
            let sources = vec![SourceFile::new(&a), SourceFile::new(&b)];
            let mut out = Cursor::new(Vec::new());
            encode(Format::BigF, &sources, NameMode::Default, 16, None, &mut out).unwrap();
            std::fs::write(&archive_path, out.into_inner()).unwrap();
        }

        let a_name = a.file_name().unwrap().to_string_lossy().into_owned();
        let replacement = write_temp(b"REPLACED-LONGER-CONTENT");

        let (archive, _warnings) =
            replace(&archive_path, a_name.as_bytes(), &replacement, None).unwrap();

        assert_eq!(archive.entries[0].size as usize, b"REPLACED-LONGER-CONTENT".len());
        for entry in &archive.entries {
            assert_eq!(entry.offset % 16, 0);
        }

        let rebuilt = std::fs::read(&archive_path).unwrap();
        assert_eq!(rebuilt.len(), archive.file_size as usize);

        std::fs::remove_file(a).ok();
        std::fs::remove_file(b).ok();
        std::fs::remove_file(replacement).ok();
        std::fs::remove_file(archive_path).ok();
    }

    #[test]
    fn errors_when_entry_name_is_absent() {
        let a = write_temp(b"solo");
        let archive_path = std::env::temp_dir().join(format!(
            "viv-replace-missing-{}.viv",
            std::process::id()
        ));
        {
            let sources = vec![SourceFile::new(&a)];
            let mut out = Cursor::new(Vec::new());
            encode(Format::BigF, &sources, NameMode::Default, 0, None, &mut out).unwrap();
            std::fs::write(&archive_path, out.into_inner()).unwrap();
        }

        let replacement = write_temp(b"x");
        let err = replace(&archive_path, b"does-not-exist.bin", &replacement, None).unwrap_err();
        assert!(matches!(err, Error::EntryNotFound(_)));

        std::fs::remove_file(a).ok();
        std::fs::remove_file(replacement).ok();
        std::fs::remove_file(archive_path).ok();
    }
}
