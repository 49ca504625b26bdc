//! fixed-width integer reads and writes over byte slices (spec §4.1)
//!
//! reads never panic on a short slice, they fail with `Error::Truncated`.
//! big-endian is used for BIGF-family 32-bit fields and C0FB 24-bit fields;
//! the C0FB magic itself is stored little-endian. everything here works one
//! byte at a time through `from_*_bytes`/`to_*_bytes` rather than punning a
//! raw buffer to a struct, so it makes no assumption about the alignment of
//! the backing memory.

use crate::error::{Error, Result};

fn need(buf: &[u8], at_offset: u64, width: usize) -> Result<()> {
    if buf.len() < width {
        return Err(Error::Truncated {
            offset: at_offset,
            needed: width - buf.len(),
        });
    }
    Ok(())
}

pub fn read_u16_be(buf: &[u8], at_offset: u64) -> Result<u16> {
    need(buf, at_offset, 2)?;
    Ok(u16::from_be_bytes([buf[0], buf[1]]))
}

pub fn read_u16_le(buf: &[u8], at_offset: u64) -> Result<u16> {
    need(buf, at_offset, 2)?;
    Ok(u16::from_le_bytes([buf[0], buf[1]]))
}

pub fn read_u24_be(buf: &[u8], at_offset: u64) -> Result<u32> {
    need(buf, at_offset, 3)?;
    Ok(u32::from_be_bytes([0, buf[0], buf[1], buf[2]]))
}

pub fn read_u32_be(buf: &[u8], at_offset: u64) -> Result<u32> {
    need(buf, at_offset, 4)?;
    Ok(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

pub fn write_u16_be(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub fn write_u16_le(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// writes the low 24 bits of `v`, big-endian. callers are responsible for
/// making sure `v <= 0x00FF_FFFF`; offsets/sizes in C0FB archives are bounds
/// checked against the file size well before they'd ever overflow this.
pub fn write_u24_be(out: &mut Vec<u8>, v: u32) {
    let b = v.to_be_bytes();
    out.extend_from_slice(&b[1..4]);
}

pub fn write_u32_be(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}
