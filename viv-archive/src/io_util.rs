//! small reader helpers shared by the header and directory-walker code

use std::io::{self, Read};

/// reads into `buf` until it's full or the source is exhausted, never
/// erroring on a short read. returns the number of bytes actually read.
pub fn read_as_much_as_possible<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
