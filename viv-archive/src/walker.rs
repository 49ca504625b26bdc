//! tolerant, chunked directory walker (spec §4.4)
//!
//! the walker never dereferences a byte it hasn't read into its chunk
//! buffer, and never trusts a declared entry count: it streams forward in
//! fixed-size chunks, stopping the moment the directory stops looking like
//! a directory, and returns whatever entries it collected as a success
//! rather than an error. only an I/O error short-circuits it.

use std::io::Read;

use crate::codec::{read_u24_be, read_u32_be};
use crate::entry::DirEntry;
use crate::error::Result;
use crate::header::HeaderInfo;
use crate::io_util::read_as_much_as_possible;
use crate::name::{scan_reject, NameMode};

pub const CHUNK_SIZE: usize = 8192;
const MAX_NAME_LEN: usize = 254;
/// hard cap on how many entries we'll ever materialize, independent of
/// what the header claims (spec §5 resource discipline).
pub const MAX_ENTRIES: u64 = 1 << 24;

pub struct WalkResult {
    pub entries: Vec<DirEntry>,
    pub observed_entry_count: u64,
    /// absolute offset of the first byte after the last entry this walk
    /// accepted (or the directory start, if it accepted none).
    pub directory_end: u64,
}

/// a rolling buffer over `R` that reads ahead in `CHUNK_SIZE` increments
/// and compacts already-consumed bytes, so memory use stays bounded
/// regardless of how far into the file we've walked.
struct ChunkCursor<'r, R: Read> {
    reader: &'r mut R,
    buf: Vec<u8>,
    pos: usize,
    base: u64,
    eof: bool,
}

impl<'r, R: Read> ChunkCursor<'r, R> {
    fn new(reader: &'r mut R, start: u64) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            pos: 0,
            base: start,
            eof: false,
        }
    }

    fn absolute_pos(&self) -> u64 {
        self.base + self.pos as u64
    }

    fn ensure(&mut self, want: usize) -> std::io::Result<()> {
        while self.buf.len() - self.pos < want && !self.eof {
            if self.pos > 0 {
                self.buf.drain(0..self.pos);
                self.base += self.pos as u64;
                self.pos = 0;
            }
            let old_len = self.buf.len();
            self.buf.resize(old_len + CHUNK_SIZE, 0);
            let read = read_as_much_as_possible(self.reader, &mut self.buf[old_len..])?;
            self.buf.truncate(old_len + read);
            if read == 0 {
                self.eof = true;
            }
        }
        Ok(())
    }

    fn take_fixed(&mut self, n: usize) -> std::io::Result<Option<Vec<u8>>> {
        self.ensure(n)?;
        if self.buf.len() - self.pos < n {
            return Ok(None);
        }
        let out = self.buf[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Ok(Some(out))
    }

    fn next_byte(&mut self) -> std::io::Result<Option<u8>> {
        self.ensure(1)?;
        if self.pos >= self.buf.len() {
            return Ok(None);
        }
        let b = self.buf[self.pos];
        self.pos += 1;
        Ok(Some(b))
    }
}

enum NameScan {
    Name(Vec<u8>),
    /// ran out of file, or the name grew past the structural length limit,
    /// before a terminator was found.
    StopStructural,
    /// a byte failed the character policy after at least one entry had
    /// already been accepted.
    StopPolicy,
}

fn scan_name<R: Read>(
    cursor: &mut ChunkCursor<'_, R>,
    mode: NameMode,
    have_prior_entry: bool,
) -> std::io::Result<NameScan> {
    let mut name = Vec::new();
    loop {
        let Some(b) = cursor.next_byte()? else {
            return Ok(NameScan::StopStructural);
        };
        if b == 0 {
            return Ok(NameScan::Name(name));
        }
        if scan_reject(b, mode) && have_prior_entry {
            return Ok(NameScan::StopPolicy);
        }
        name.push(b);
        if name.len() > MAX_NAME_LEN {
            return Ok(NameScan::StopStructural);
        }
    }
}

pub fn walk_directory<R: Read>(
    reader: &mut R,
    header: &HeaderInfo,
    fixed_entry_len: Option<u32>,
    name_mode: NameMode,
) -> Result<WalkResult> {
    let mut cursor = ChunkCursor::new(reader, header.directory_start);
    let mut entries = Vec::new();
    let declared = header.declared_entry_count.min(MAX_ENTRIES);
    let prefix_len = header.format.offset_width() * 2;

    for _ in 0..declared {
        let entry_start = cursor.absolute_pos();

        let Some(prefix) = cursor.take_fixed(prefix_len)? else {
            break;
        };

        let (offset, size) = if header.format.is_bigf_family() {
            (
                read_u32_be(&prefix[0..4], entry_start)?,
                read_u32_be(&prefix[4..8], entry_start + 4)?,
            )
        } else {
            (
                read_u24_be(&prefix[0..3], entry_start)?,
                read_u24_be(&prefix[3..6], entry_start + 3)?,
            )
        };

        let name_file_offset = cursor.absolute_pos();

        let name = match fixed_entry_len {
            Some(fixed_len) => {
                let region_len = (fixed_len as usize).saturating_sub(prefix_len);
                match cursor.take_fixed(region_len)? {
                    None => break,
                    Some(region) => match region.iter().position(|&b| b == 0) {
                        Some(nul_at) => region[..nul_at].to_vec(),
                        None => region,
                    },
                }
            }
            None => match scan_name(&mut cursor, name_mode, !entries.is_empty())? {
                NameScan::Name(name) => name,
                NameScan::StopStructural | NameScan::StopPolicy => break,
            },
        };

        entries.push(DirEntry {
            offset,
            size,
            name_file_offset,
            name,
        });
    }

    Ok(WalkResult {
        observed_entry_count: entries.len() as u64,
        directory_end: cursor.absolute_pos(),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;
    use std::io::Cursor;

    fn header(format: Format, directory_start: u64, declared_entry_count: u64) -> HeaderInfo {
        HeaderInfo {
            format,
            declared_archive_size: None,
            declared_header_size: None,
            declared_entry_count,
            directory_start,
        }
    }

    fn bigf_entry(offset: u32, size: u32, name: &[u8]) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&offset.to_be_bytes());
        v.extend_from_slice(&size.to_be_bytes());
        v.extend_from_slice(name);
        v.push(0);
        v
    }

    #[test]
    fn walks_well_formed_bigf_directory() {
        let mut dir = Vec::new();
        dir.extend(bigf_entry(46, 5, b"A.txt"));
        dir.extend(bigf_entry(51, 4, b"B.bin"));
        dir.extend(bigf_entry(55, 1, b"C"));

        let mut reader = Cursor::new(dir);
        let h = header(Format::BigF, 0, 3);
        let result = walk_directory(&mut reader, &h, None, NameMode::Default).unwrap();

        assert_eq!(result.observed_entry_count, 3);
        assert_eq!(result.entries[0].name, b"A.txt");
        assert_eq!(result.entries[2].offset, 55);
    }

    #[test]
    fn stops_on_inflated_entry_count() {
        let mut dir = Vec::new();
        dir.extend(bigf_entry(46, 5, b"A.txt"));
        dir.extend(bigf_entry(51, 4, b"B.bin"));
        // garbage that fails the default character policy
        dir.extend_from_slice(&[0xFF; 16]);

        let mut reader = Cursor::new(dir);
        let h = header(Format::BigF, 0, 100);
        let result = walk_directory(&mut reader, &h, None, NameMode::Default).unwrap();

        assert_eq!(result.observed_entry_count, 2);
    }

    #[test]
    fn stops_at_eof_mid_entry() {
        let mut dir = Vec::new();
        dir.extend(bigf_entry(46, 5, b"A.txt"));
        dir.extend_from_slice(&[0, 0, 0, 100]); // truncated second entry

        let mut reader = Cursor::new(dir);
        let h = header(Format::BigF, 0, 5);
        let result = walk_directory(&mut reader, &h, None, NameMode::Default).unwrap();

        assert_eq!(result.observed_entry_count, 1);
    }

    #[test]
    fn fixed_entry_length_with_non_printable_name() {
        let fixed_len = 80u32;
        let mut dir = Vec::new();
        let mut entry = Vec::new();
        entry.extend_from_slice(&10u32.to_be_bytes());
        entry.extend_from_slice(&5u32.to_be_bytes());
        let mut name = vec![0xABu8; 72];
        name[5] = 0xCD;
        entry.extend_from_slice(&name);
        assert_eq!(entry.len(), fixed_len as usize);
        dir.extend(entry);

        let mut reader = Cursor::new(dir);
        let h = header(Format::BigF, 0, 1);
        let result = walk_directory(&mut reader, &h, Some(fixed_len), NameMode::Hex).unwrap();

        assert_eq!(result.observed_entry_count, 1);
        assert_eq!(result.entries[0].name.len(), 72);
    }

    #[test]
    fn c0fb_24bit_entries() {
        let mut e = Vec::new();
        {
            let mut buf = Vec::new();
            crate::codec::write_u24_be(&mut buf, 0x20);
            crate::codec::write_u24_be(&mut buf, 0x10);
            buf.extend_from_slice(b"a");
            buf.push(0);
            e.extend(buf);
        }
        {
            let mut buf = Vec::new();
            crate::codec::write_u24_be(&mut buf, 0x30);
            crate::codec::write_u24_be(&mut buf, 0x10);
            buf.extend_from_slice(b"b");
            buf.push(0);
            e.extend(buf);
        }

        let mut reader = Cursor::new(e);
        let h = header(Format::C0fb, 0, 2);
        let result = walk_directory(&mut reader, &h, None, NameMode::Default).unwrap();

        assert_eq!(result.observed_entry_count, 2);
        assert_eq!(result.entries[0].offset, 0x20);
        assert_eq!(result.entries[1].name, b"b");
    }
}
