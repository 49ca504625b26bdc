use std::path::PathBuf;

use anstream::println;
use anyhow::Context;
use clap::Args as ClapArgs;
use owo_colors::OwoColorize;

use crate::utils;

/// replace a single entry in an existing archive, rewriting it atomically
#[derive(ClapArgs)]
pub struct Args {
    /// archive to patch
    #[arg(value_parser = utils::is_file, value_hint = clap::ValueHint::FilePath)]
    archive: PathBuf,

    /// file whose contents replace the target entry
    #[arg(value_parser = utils::is_file, value_hint = clap::ValueHint::FilePath)]
    replacement: PathBuf,

    /// name of the archive entry to replace (defaults to the replacement file's own name)
    #[arg(short = 'f', long = "filename")]
    target_name: Option<String>,

    /// pad entry offsets up to this byte boundary instead of the archive's inferred alignment
    #[arg(long = "alf", value_parser = utils::alignment)]
    align: Option<u32>,

    /// the target name and the replacement's own filename are lowercase hex of raw bytes
    #[arg(short = 'x', long)]
    fn_hex: bool,
}

impl Args {
    pub fn start(self) -> anyhow::Result<()> {
        let name = match self.target_name {
            Some(name) => name,
            None => self
                .replacement
                .file_name()
                .context("replacement path has no filename")?
                .to_string_lossy()
                .into_owned(),
        };

        let target_bytes = if self.fn_hex {
            viv_archive::hex_decode(&name)?
        } else {
            name.clone().into_bytes()
        };

        let (archive, warnings) =
            viv_archive::replace_entry(&self.archive, &target_bytes, &self.replacement, self.align)
                .with_context(|| format!("replacing {name:?} in {}", self.archive.display()))?;

        println!(
            "{} replaced {name:?} in {} ({} entries)",
            "[+]".green(),
            self.archive.display(),
            archive.observed_entry_count
        );
        for warning in &warnings {
            println!("{} {warning}", "[!]".yellow());
        }

        Ok(())
    }
}
