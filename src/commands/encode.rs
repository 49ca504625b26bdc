use std::path::PathBuf;

use anstream::println;
use anyhow::Context;
use clap::{Args as ClapArgs, ValueEnum};
use owo_colors::OwoColorize;

use crate::utils;
use viv_archive::{Format, VivOptions};

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Bigf,
    Bigh,
    Big4,
    C0fb,
}

impl From<FormatArg> for Format {
    fn from(f: FormatArg) -> Format {
        match f {
            FormatArg::Bigf => Format::BigF,
            FormatArg::Bigh => Format::BigH,
            FormatArg::Big4 => Format::Big4,
            FormatArg::C0fb => Format::C0fb,
        }
    }
}

/// encode (create) an archive from a list of input files
#[derive(ClapArgs)]
pub struct Args {
    /// archive to write
    #[arg(value_hint = clap::ValueHint::FilePath)]
    archive: PathBuf,

    /// input files, stored in the given order
    #[arg(required = true, value_hint = clap::ValueHint::FilePath)]
    in_files: Vec<PathBuf>,

    /// container format to write
    #[arg(long = "fmt", default_value = "bigf")]
    format: FormatArg,

    /// print what would be written without creating the archive
    #[arg(short = 'p', long)]
    dry_run: bool,

    /// pad entry offsets up to this byte boundary (0, 2, 4, 8 or 16)
    #[arg(long = "alf", value_parser = utils::alignment, default_value_t = 0)]
    align: u32,

    /// write directory entries as this many fixed bytes wide instead of NUL-terminated
    #[arg(long = "dnl", value_parser = utils::fixed_entry_len)]
    dir_entry_len_fixed: Option<u32>,

    /// store entry names as lowercase hex of their raw bytes rather than text
    #[arg(short = 'x', long)]
    fn_hex: bool,

    /// write the command line that reproduces this archive to `<archive>.txt`
    #[arg(long = "we")]
    write_encode_line: bool,
}

impl Args {
    pub fn start(self) -> anyhow::Result<()> {
        let opts = VivOptions {
            dry_run: self.dry_run,
            dir_entry_len_fixed: self.dir_entry_len_fixed,
            fn_hex: self.fn_hex,
            align: self.align,
        };

        let report = viv_archive::viv(&self.archive, &self.in_files, self.format.into(), opts)
            .with_context(|| format!("encoding {}", self.archive.display()))?;

        if self.dry_run {
            println!(
                "{} would write {} ({} entries)",
                "[+]".green(),
                self.archive.display(),
                report.archive_info.entry_count
            );
        } else {
            println!(
                "{} wrote {} ({} entries)",
                "[+]".green(),
                self.archive.display(),
                report.archive_info.entry_count
            );
        }
        for warning in &report.warnings {
            println!("{} {warning}", "[!]".yellow());
        }

        if self.write_encode_line && !self.dry_run {
            let line = self.reencode_command_line();
            let mut txt_name = self.archive.file_name().unwrap_or_default().to_os_string();
            txt_name.push(".txt");
            let txt_path = self.archive.with_file_name(txt_name);
            std::fs::write(&txt_path, line)
                .with_context(|| format!("writing {}", txt_path.display()))?;
            println!("{} wrote {}", "[+]".green(), txt_path.display());
        }

        Ok(())
    }

    fn reencode_command_line(&self) -> String {
        let mut line = String::from("unvivtool e");
        line.push(' ');
        line.push_str(&self.archive.to_string_lossy());
        for input in &self.in_files {
            line.push(' ');
            line.push_str(&input.to_string_lossy());
        }
        if self.align != 0 {
            line.push_str(&format!(" --alf {}", self.align));
        }
        if self.fn_hex {
            line.push_str(" -x");
        }
        if let Some(fixed) = self.dir_entry_len_fixed {
            line.push_str(&format!(" --dnl {fixed}"));
        }
        line
    }
}
