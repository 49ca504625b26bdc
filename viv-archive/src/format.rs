//! archive format tag and magic detection (spec §3, §4.3)

use crate::error::Error;

/// the four container variants this engine understands.
///
/// BIGF/BIGH/BIG4 share an identical 16-byte header and directory layout,
/// differing only in the magic bytes. C0FB is a distinct, more compact
/// layout (24-bit offsets/sizes, a 6-byte header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    BigF,
    BigH,
    Big4,
    C0fb,
}

impl Format {
    /// ASCII magic for the BIGF-family formats. `None` for C0FB, whose
    /// magic is a little-endian 16-bit tag rather than 4 ASCII bytes.
    pub fn ascii_magic(self) -> Option<&'static [u8; 4]> {
        match self {
            Format::BigF => Some(b"BIGF"),
            Format::BigH => Some(b"BIGH"),
            Format::Big4 => Some(b"BIG4"),
            Format::C0fb => None,
        }
    }

    pub fn is_bigf_family(self) -> bool {
        !matches!(self, Format::C0fb)
    }

    /// width in bytes of a directory entry's `offset`/`size` fields.
    pub fn offset_width(self) -> usize {
        if self.is_bigf_family() { 4 } else { 3 }
    }

    /// detect the format from the first bytes of a file. looks at up to 4
    /// bytes: BIGF-family is recognized by its 4-byte ASCII magic, C0FB by
    /// its 2-byte little-endian tag `0xFBC0` (bytes `C0 FB`) followed by a
    /// second 16-bit tag, value `0x8000`, stored little-endian the same way
    /// (bytes `00 80`) — this is the byte order the worked decode example
    /// uses, not the big-endian `80 00` the header prose also mentions;
    /// see DESIGN.md for the resolution of that inconsistency.
    pub fn detect(head: &[u8]) -> Result<Self, Error> {
        if head.len() < 4 {
            return Err(Error::Truncated {
                offset: 0,
                needed: 4 - head.len(),
            });
        }

        match &head[0..4] {
            b"BIGF" => Ok(Format::BigF),
            b"BIGH" => Ok(Format::BigH),
            b"BIG4" => Ok(Format::Big4),
            _ if head[0] == 0xC0 && head[1] == 0xFB && head[2] == 0x00 && head[3] == 0x80 => {
                Ok(Format::C0fb)
            }
            _ => Err(Error::BadMagic {
                found: head[0..4].to_vec(),
            }),
        }
    }
}
