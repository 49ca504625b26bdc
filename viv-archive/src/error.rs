//! error taxonomy for the archive engine
//!
//! every variant here is a distinct discriminant a caller can match on;
//! see spec §7 for the contract each one is meant to uphold.

use std::io;
use std::path::PathBuf;

use crate::format::Format;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("unexpected end of input at offset {offset}: needed {needed} more byte(s)")]
    Truncated { offset: u64, needed: usize },

    #[error("unrecognized archive magic {found:02x?}")]
    BadMagic { found: Vec<u8> },

    #[error("header fields are out of range for a {file_size}-byte file: {reason}")]
    HeaderOutOfRange { file_size: u64, reason: String },

    #[error("directory is corrupt: {0}")]
    DirectoryCorrupt(String),

    #[error("entry name is invalid: {0}")]
    NameInvalid(String),

    #[error("entry not found: {0}")]
    EntryNotFound(String),

    #[error("refusing to overwrite existing path {0}")]
    Collision(PathBuf),

    #[error("{operation} is not supported for format {format:?}")]
    UnsupportedFormat {
        format: Format,
        operation: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
