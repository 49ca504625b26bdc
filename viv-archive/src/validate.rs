//! directory validator: offset-range, overlap, alignment and
//! header-vs-observed consistency checks (spec §4.5)
//!
//! lenient and strict mode share this exact traversal; they differ only in
//! whether an anomaly becomes a `Warning` or an `Error::DirectoryCorrupt`.
//! spec §9 calls this sharing "the single most important contract" of the
//! whole walker/validator pair.

use crate::entry::{Archive, DirEntry, Warning};
use crate::error::{Error, Result};
use crate::format::Format;
use crate::header::HeaderInfo;
use crate::walker::WalkResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Lenient,
    Strict,
}

/// runs invariants 4-6 (spec §3) over a walked directory, returning the
/// materialized `Archive` plus any warnings. In `Strict` mode the same
/// anomalies become `Error::DirectoryCorrupt` instead of warnings.
pub fn validate(
    header: HeaderInfo,
    walk: WalkResult,
    file_size: u64,
    mode: ValidationMode,
) -> Result<(Archive, Vec<Warning>)> {
    let mut warnings = Vec::new();

    let observed_header_size = match header.format {
        Format::C0fb => walk.directory_end,
        _ => header.declared_header_size.unwrap_or(walk.directory_end),
    };

    // invariant 4: every entry's offset/size stays inside the file, past
    // the directory region.
    for (i, e) in walk.entries.iter().enumerate() {
        if (e.offset as u64) < observed_header_size {
            corrupt_or_warn(
                mode,
                &mut warnings,
                Warning::EntryOutOfRange {
                    index: i,
                    reason: format!(
                        "entry offset {} precedes end of directory at {observed_header_size}",
                        e.offset
                    ),
                },
            )?;
        }
        if e.end() > file_size {
            corrupt_or_warn(
                mode,
                &mut warnings,
                Warning::EntryOutOfRange {
                    index: i,
                    reason: format!("entry end {} exceeds file size {file_size}", e.end()),
                },
            )?;
        }
    }

    // invariant 5: no overlap between consecutive entries in directory order
    for pair in walk.entries.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.end() > b.offset as u64 {
            warn_or_corrupt(
                mode,
                &mut warnings,
                Warning::OverlappingEntries {
                    first: index_of(&walk.entries, a),
                    second: index_of(&walk.entries, b),
                },
            )?;
        }
    }

    // invariant 6: strict-mode-only consistency checks
    if let Some(declared_archive_size) = header.declared_archive_size {
        if declared_archive_size != file_size {
            warn_or_corrupt(
                mode,
                &mut warnings,
                Warning::ArchiveSizeMismatch {
                    declared: declared_archive_size,
                    file_size,
                },
            )?;
        }
    }

    if header.declared_entry_count != walk.observed_entry_count {
        warn_or_corrupt(
            mode,
            &mut warnings,
            Warning::EntryCountMismatch {
                declared: header.declared_entry_count,
                observed: walk.observed_entry_count,
            },
        )?;
    }

    if let Some(last) = walk.entries.last() {
        if last.end() != file_size {
            warn_or_corrupt(
                mode,
                &mut warnings,
                Warning::TrailingEntryDoesNotReachEnd {
                    last_entry_end: last.end(),
                    file_size,
                },
            )?;
        }
    }

    let archive = Archive {
        format: header.format,
        file_size,
        declared_archive_size: header.declared_archive_size,
        declared_header_size: Some(observed_header_size),
        declared_entry_count: header.declared_entry_count,
        observed_entry_count: walk.observed_entry_count,
        entries: walk.entries,
    };

    Ok((archive, warnings))
}

fn index_of(entries: &[DirEntry], needle: &DirEntry) -> usize {
    entries
        .iter()
        .position(|e| std::ptr::eq(e, needle))
        .unwrap_or(0)
}

/// shared by invariants 4-6: fatal in `Strict` mode, a recorded `Warning` in
/// `Lenient` mode (spec §4.5 - the two modes share this exact traversal and
/// differ only in the severity assigned to what it finds).
fn corrupt_or_warn(
    mode: ValidationMode,
    warnings: &mut Vec<Warning>,
    warning: Warning,
) -> Result<()> {
    match mode {
        ValidationMode::Strict => Err(Error::DirectoryCorrupt(warning.to_string())),
        ValidationMode::Lenient => {
            log::warn!("{warning}");
            warnings.push(warning);
            Ok(())
        }
    }
}

/// invariant 6 (strict-only consistency) violations: warning in lenient
/// mode, fatal in strict mode. Named the other way round from
/// `corrupt_or_warn` to read naturally at each call site.
fn warn_or_corrupt(
    mode: ValidationMode,
    warnings: &mut Vec<Warning>,
    warning: Warning,
) -> Result<()> {
    corrupt_or_warn(mode, warnings, warning)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::DirEntry;

    fn header(declared_entry_count: u64, declared_archive_size: Option<u64>) -> HeaderInfo {
        HeaderInfo {
            format: Format::BigF,
            declared_archive_size,
            declared_header_size: Some(16),
            declared_entry_count,
            directory_start: 16,
        }
    }

    fn entry(offset: u32, size: u32) -> DirEntry {
        DirEntry {
            offset,
            size,
            name_file_offset: 0,
            name: b"x".to_vec(),
        }
    }

    #[test]
    fn strict_accepts_consistent_archive() {
        let walk = WalkResult {
            entries: vec![entry(16, 10)],
            observed_entry_count: 1,
            directory_end: 16,
        };
        let (archive, warnings) =
            validate(header(1, Some(26)), walk, 26, ValidationMode::Strict).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(archive.entries.len(), 1);
    }

    #[test]
    fn strict_rejects_entry_count_mismatch() {
        let walk = WalkResult {
            entries: vec![entry(16, 10)],
            observed_entry_count: 1,
            directory_end: 16,
        };
        let err = validate(header(2, Some(26)), walk, 26, ValidationMode::Strict).unwrap_err();
        assert!(matches!(err, Error::DirectoryCorrupt(_)));
    }

    #[test]
    fn lenient_warns_instead_of_failing() {
        let walk = WalkResult {
            entries: vec![entry(16, 10)],
            observed_entry_count: 1,
            directory_end: 16,
        };
        let (_, warnings) =
            validate(header(2, Some(26)), walk, 26, ValidationMode::Lenient).unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn rejects_entry_escaping_the_file() {
        let walk = WalkResult {
            entries: vec![entry(16, 1000)],
            observed_entry_count: 1,
            directory_end: 16,
        };
        let err = validate(header(1, Some(26)), walk, 26, ValidationMode::Strict).unwrap_err();
        assert!(matches!(err, Error::DirectoryCorrupt(_)));
    }

    #[test]
    fn detects_overlap() {
        let walk = WalkResult {
            entries: vec![entry(16, 20), entry(30, 10)],
            observed_entry_count: 2,
            directory_end: 16,
        };
        let (_, warnings) =
            validate(header(2, None), walk, 40, ValidationMode::Lenient).unwrap();
        assert!(
            warnings
                .iter()
                .any(|w| matches!(w, Warning::OverlappingEntries { .. }))
        );
    }
}
