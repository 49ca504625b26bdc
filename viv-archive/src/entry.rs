//! in-memory archive model (spec §3)

use std::fmt;
use std::path::PathBuf;

use crate::format::Format;

/// one directory entry, resolved into the engine's in-memory shape.
///
/// `name` has already had its terminating NUL stripped; in hex mode it
/// holds the raw on-archive bytes, unescaped (escaping to/from base16
/// happens at the filesystem boundary, not here).
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub offset: u32,
    pub size: u32,
    /// absolute byte offset in the source file where this entry's name
    /// begins (used by tooling that wants to point back at the directory).
    pub name_file_offset: u64,
    pub name: Vec<u8>,
}

impl DirEntry {
    pub fn end(&self) -> u64 {
        self.offset as u64 + self.size as u64
    }
}

/// a complete decoded archive, as produced by the directory walker + validator.
#[derive(Debug, Clone)]
pub struct Archive {
    pub format: Format,
    pub file_size: u64,
    pub declared_archive_size: Option<u64>,
    /// authoritative for BIGF-family; for C0FB this is synthesized after the
    /// directory is walked (spec §4.3) and is never `None`.
    pub declared_header_size: Option<u64>,
    pub declared_entry_count: u64,
    pub observed_entry_count: u64,
    pub entries: Vec<DirEntry>,
}

impl Archive {
    /// the byte offset immediately after the last byte belonging to the
    /// directory (header + all entries' offset/size/name fields).
    pub fn observed_header_size(&self) -> u64 {
        match &self.entries.last() {
            Some(_) => self
                .entries
                .iter()
                .map(|e| e.name_file_offset + e.name.len() as u64 + 1)
                .max()
                .unwrap_or(0),
            None => self.declared_header_size.unwrap_or(0),
        }
    }

    /// largest power-of-two divisor common to every non-zero entry offset,
    /// restricted to `{0, 2, 4, 8, 16}` (spec §4.5). Offset `0` is excluded
    /// from the gcd computation since an entry placed at the very start of
    /// the file (no header) carries no alignment information.
    pub fn inferred_alignment(&self) -> u32 {
        const CANDIDATES: [u32; 4] = [16, 8, 4, 2];

        let mut g: u64 = 0;
        for entry in &self.entries {
            if entry.offset == 0 {
                continue;
            }
            g = gcd(g, entry.offset as u64);
        }

        if g == 0 {
            return 0;
        }

        for candidate in CANDIDATES {
            if g % candidate as u64 == 0 {
                return candidate;
            }
        }
        0
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// a recoverable anomaly found during decode/validation/extraction. these
/// never abort a lenient-mode operation; they're attached to its result.
#[derive(Debug, Clone)]
pub enum Warning {
    EntryCountMismatch { declared: u64, observed: u64 },
    ArchiveSizeMismatch { declared: u64, file_size: u64 },
    TrailingEntryDoesNotReachEnd { last_entry_end: u64, file_size: u64 },
    OverlappingEntries { first: usize, second: usize },
    EntryOutOfRange { index: usize, reason: String },
    NameRejected { index: usize, reason: String },
    PathSkipped { path: PathBuf, reason: String },
    OutputCollisionSkipped { path: PathBuf },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::EntryCountMismatch { declared, observed } => write!(
                f,
                "header claimed {declared} entries, found {observed}"
            ),
            Warning::ArchiveSizeMismatch { declared, file_size } => write!(
                f,
                "header declares archive size {declared}, file is {file_size} bytes"
            ),
            Warning::TrailingEntryDoesNotReachEnd {
                last_entry_end,
                file_size,
            } => write!(
                f,
                "last entry ends at {last_entry_end}, file is {file_size} bytes"
            ),
            Warning::OverlappingEntries { first, second } => {
                write!(f, "entries {first} and {second} overlap")
            }
            Warning::EntryOutOfRange { index, reason } => {
                write!(f, "entry {index}: {reason}")
            }
            Warning::NameRejected { index, reason } => {
                write!(f, "entry {index}: {reason}")
            }
            Warning::PathSkipped { path, reason } => {
                write!(f, "skipping {}: {reason}", path.display())
            }
            Warning::OutputCollisionSkipped { path } => {
                write!(f, "{} already exists, skipping", path.display())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(offset: u32) -> DirEntry {
        DirEntry {
            offset,
            size: 1,
            name_file_offset: 0,
            name: b"a".to_vec(),
        }
    }

    #[test]
    fn infers_power_of_two_alignment() {
        let archive = Archive {
            format: Format::BigF,
            file_size: 200,
            declared_archive_size: None,
            declared_header_size: None,
            declared_entry_count: 3,
            observed_entry_count: 3,
            entries: vec![entry(64), entry(80), entry(96)],
        };
        assert_eq!(archive.inferred_alignment(), 16);
    }

    #[test]
    fn byte_packed_entries_infer_zero_alignment() {
        let archive = Archive {
            format: Format::BigF,
            file_size: 200,
            declared_archive_size: None,
            declared_header_size: None,
            declared_entry_count: 2,
            observed_entry_count: 2,
            entries: vec![entry(17), entry(33)],
        };
        assert_eq!(archive.inferred_alignment(), 0);
    }
}
