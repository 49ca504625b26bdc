//! decoder/encoder/patcher for the BIGF/BIGH/BIG4/C0FB uncompressed
//! archive container formats.
//!
//! the engine is deliberately defensive: every read path tolerates
//! untrusted, truncated, or adversarial input without panicking, without
//! unbounded memory growth, and without ever changing the process's
//! current working directory. [`api`] is the entry point most callers
//! want; the other modules are exposed for callers that need finer
//! control over one stage of the pipeline.

mod api;
mod codec;
mod encode;
mod entry;
mod error;
mod extract;
mod format;
mod header;
mod io_util;
mod name;
mod replace;
mod validate;
mod walker;

pub use api::{
    get_info, replace as replace_entry, unviv, viv, ArchiveInfo, EntryInfo, UnvivOptions,
    UnvivReport, VivOptions, VivReport,
};
pub use encode::SourceFile;
pub use entry::{Archive, DirEntry, Warning};
pub use error::{Error, Result};
pub use extract::{CustomWindow, OverwritePolicy, Selector};
pub use format::Format;
pub use name::{hex_decode, hex_encode, NameMode};
pub use validate::ValidationMode;
