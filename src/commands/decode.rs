use std::path::PathBuf;

use anstream::println;
use anyhow::Context;
use clap::Args as ClapArgs;
use owo_colors::OwoColorize;

use crate::utils;
use viv_archive::{OverwritePolicy, UnvivOptions};

/// decode (extract) an archive's entries to a directory
#[derive(ClapArgs)]
pub struct Args {
    /// archive to read
    #[arg(value_parser = utils::is_file, value_hint = clap::ValueHint::FilePath)]
    archive: PathBuf,

    /// directory entries are extracted into (defaults to the archive's own directory)
    #[arg(value_hint = clap::ValueHint::DirPath)]
    out_dir: Option<PathBuf>,

    /// extract only the 1-based Nth directory entry
    #[arg(short = 'i', long = "index")]
    index: Option<usize>,

    /// extract only the entry with this name
    #[arg(short = 'f', long = "filename")]
    filename: Option<String>,

    /// print what would be extracted without writing any files
    #[arg(short = 'p', long)]
    dry_run: bool,

    /// overwrite existing output files instead of renaming around them
    #[arg(long)]
    overwrite: bool,

    /// treat directory entries as this many fixed bytes wide instead of NUL-terminated
    #[arg(long = "dnl", value_parser = utils::fixed_entry_len)]
    dir_entry_len_fixed: Option<u32>,

    /// entry names are lowercase hex of their raw bytes rather than text
    #[arg(short = 'x', long)]
    fn_hex: bool,

    /// abort on the first structural anomaly instead of skipping with a warning
    #[arg(long)]
    strict: bool,

    /// extract from this byte offset instead of the one the directory declares
    #[arg(long)]
    custom_offset: Option<u64>,

    /// extract this many bytes instead of the size the directory declares
    #[arg(long)]
    custom_size: Option<u64>,
}

impl Args {
    pub fn start(self) -> anyhow::Result<()> {
        let out_dir = self
            .out_dir
            .or_else(|| self.archive.parent().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."));

        let opts = UnvivOptions {
            file_idx: self.index,
            file_name: self.filename,
            dry_run: self.dry_run,
            dir_entry_len_fixed: self.dir_entry_len_fixed,
            fn_hex: self.fn_hex,
            strict: self.strict,
            overwrite: Some(if self.overwrite {
                OverwritePolicy::Overwrite
            } else {
                OverwritePolicy::Rename
            }),
            custom_offset: self.custom_offset,
            custom_size: self.custom_size,
        };

        let report = viv_archive::unviv(&self.archive, &out_dir, opts)
            .with_context(|| format!("decoding {}", self.archive.display()))?;

        for path in &report.extracted_paths {
            if self.dry_run {
                println!("{} would extract {}", "[+]".green(), path.display());
            } else {
                println!("{} extracted {}", "[+]".green(), path.display());
            }
        }
        for warning in &report.warnings {
            println!("{} {warning}", "[!]".yellow());
        }

        Ok(())
    }
}
