//! language-neutral engine facade (spec §6)
//!
//! this is the surface a CLI or a scripting binding calls: four
//! operations, each taking explicit options rather than consulting any
//! ambient state (no process-wide verbose/dry-run flags, no `chdir`).

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::encode::{self, SourceFile};
use crate::entry::{Archive, DirEntry, Warning};
use crate::error::Result;
use crate::extract::{self, CustomWindow, OverwritePolicy, Selector};
use crate::format::Format;
use crate::header::read_header;
use crate::name::NameMode;
use crate::replace as replace_impl;
use crate::validate::{validate, ValidationMode};
use crate::walker::walk_directory;

fn name_mode(fn_hex: bool) -> NameMode {
    if fn_hex {
        NameMode::Hex
    } else {
        NameMode::Default
    }
}

fn decode(
    archive_path: &Path,
    dir_entry_len_fixed: Option<u32>,
    fn_hex: bool,
    mode: ValidationMode,
) -> Result<(Archive, Vec<Warning>, File)> {
    let mut file = File::open(archive_path)?;
    let file_size = file.metadata()?.len();
    let header = read_header(&mut file, file_size)?;
    let walk = walk_directory(&mut file, &header, dir_entry_len_fixed, name_mode(fn_hex))?;
    let (archive, warnings) = validate(header, walk, file_size, mode)?;
    Ok((archive, warnings, file))
}

/// options for [`unviv`]. `file_idx` is 1-based, matching the CLI's `-i`;
/// `file_name` takes priority over `file_idx` when both are set.
#[derive(Debug, Clone, Default)]
pub struct UnvivOptions {
    pub file_idx: Option<usize>,
    pub file_name: Option<String>,
    pub dry_run: bool,
    pub dir_entry_len_fixed: Option<u32>,
    pub fn_hex: bool,
    pub strict: bool,
    pub overwrite: Option<OverwritePolicy>,
    pub custom_offset: Option<u64>,
    pub custom_size: Option<u64>,
}

/// what `unviv` did, or would have done under `dry_run`.
#[derive(Debug, Clone)]
pub struct UnvivReport {
    pub extracted_paths: Vec<PathBuf>,
    pub warnings: Vec<Warning>,
}

/// extracts one entry or the whole archive to `out_dir`. `verbose` callers
/// get their detail from the `log` facade; this return value carries only
/// the data a caller needs to act on (spec's "boolean return plus
/// diagnostic lines emitted to the log channel", enriched with the actual
/// paths touched so dry runs are useful without scraping logs).
pub fn unviv(archive_path: &Path, out_dir: &Path, opts: UnvivOptions) -> Result<UnvivReport> {
    let mode = if opts.strict {
        ValidationMode::Strict
    } else {
        ValidationMode::Lenient
    };
    let name_mode_val = name_mode(opts.fn_hex);
    log::debug!(
        "decoding {} ({})",
        archive_path.display(),
        if opts.strict { "strict" } else { "lenient" }
    );
    let (archive, mut warnings, mut file) =
        decode(archive_path, opts.dir_entry_len_fixed, opts.fn_hex, mode)?;
    log::info!(
        "{}: {} entries",
        archive_path.display(),
        archive.observed_entry_count
    );

    let selector = match (&opts.file_name, opts.file_idx) {
        (Some(name), _) => Some(Selector::Name(name.as_str())),
        (None, Some(idx)) => Some(Selector::Index(idx)),
        (None, None) => None,
    };
    let overwrite = opts.overwrite.unwrap_or(OverwritePolicy::Rename);

    if opts.dry_run {
        let targets: Vec<&DirEntry> = match &selector {
            Some(Selector::Index(idx)) => archive.entries.get(idx.wrapping_sub(1)).into_iter().collect(),
            Some(Selector::Name(name)) => archive
                .entries
                .iter()
                .filter(|e| extract::resolved_filename(e, name_mode_val) == *name)
                .collect(),
            None => archive.entries.iter().collect(),
        };
        let extracted_paths = targets
            .into_iter()
            .map(|e| out_dir.join(extract::resolved_filename(e, name_mode_val)))
            .collect();
        return Ok(UnvivReport {
            extracted_paths,
            warnings,
        });
    }

    let custom = CustomWindow {
        offset: opts.custom_offset,
        size: opts.custom_size,
    };

    let extracted_paths = match selector {
        Some(selector) => {
            let mut w = extract::extract_one(
                &archive,
                &mut file,
                out_dir,
                selector.clone(),
                name_mode_val,
                overwrite,
                custom,
            )?;
            warnings.append(&mut w);
            let name = match selector {
                Selector::Name(name) => name.to_string(),
                Selector::Index(idx) => {
                    extract::resolved_filename(&archive.entries[idx - 1], name_mode_val)
                }
            };
            vec![out_dir.join(name)]
        }
        None => {
            let mut w = extract::extract_all(
                &archive,
                &mut file,
                out_dir,
                name_mode_val,
                overwrite,
                mode,
            )?;
            warnings.append(&mut w);
            archive
                .entries
                .iter()
                .map(|e| out_dir.join(extract::resolved_filename(e, name_mode_val)))
                .collect()
        }
    };

    Ok(UnvivReport {
        extracted_paths,
        warnings,
    })
}

/// options for [`viv`].
#[derive(Debug, Clone, Default)]
pub struct VivOptions {
    pub dry_run: bool,
    pub dir_entry_len_fixed: Option<u32>,
    pub fn_hex: bool,
    pub align: u32,
}

#[derive(Debug, Clone)]
pub struct VivReport {
    pub archive_info: ArchiveInfo,
    pub warnings: Vec<Warning>,
}

/// builds `format`'s archive at `archive_path` from `input_paths`. under
/// `dry_run`, no file is written: the plan is computed (including which
/// inputs would be skipped) and returned without touching disk.
pub fn viv(
    archive_path: &Path,
    input_paths: &[PathBuf],
    format: Format,
    opts: VivOptions,
) -> Result<VivReport> {
    let sources: Vec<SourceFile> = input_paths.iter().map(SourceFile::new).collect();
    let name_mode_val = name_mode(opts.fn_hex);

    if opts.dry_run {
        let mut sink = std::io::sink();
        let (archive, warnings) = encode::encode(
            format,
            &sources,
            name_mode_val,
            opts.align,
            opts.dir_entry_len_fixed,
            &mut sink,
        )?;
        return Ok(VivReport {
            archive_info: ArchiveInfo::from_archive(&archive, name_mode_val),
            warnings,
        });
    }

    let mut out = std::io::BufWriter::new(std::fs::File::create(archive_path)?);
    let (archive, warnings) = encode::encode(
        format,
        &sources,
        name_mode_val,
        opts.align,
        opts.dir_entry_len_fixed,
        &mut out,
    )?;

    Ok(VivReport {
        archive_info: ArchiveInfo::from_archive(&archive, name_mode_val),
        warnings,
    })
}

/// rebuilds `archive_path` with the entry named `target_name` replaced by
/// the contents of `replacement_path`. `target_name` is raw bytes so a
/// hex-mode archive's non-UTF-8 names can be targeted too. `align`
/// overrides the alignment the engine would otherwise infer from the
/// existing archive.
pub fn replace(
    archive_path: &Path,
    target_name: &[u8],
    replacement_path: &Path,
    align: Option<u32>,
) -> Result<(Archive, Vec<Warning>)> {
    replace_impl::replace(archive_path, target_name, replacement_path, align)
}

/// one entry as reported by [`get_info`].
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub name: String,
    pub offset: u32,
    pub size: u32,
}

/// archive metadata as reported by [`get_info`].
#[derive(Debug, Clone)]
pub struct ArchiveInfo {
    pub format: Format,
    pub archive_size: u64,
    pub entry_count: u64,
    pub header_size: u64,
    pub entries: Vec<EntryInfo>,
    /// `Some(reason)` when the archive would fail strict-mode validation;
    /// `None` when it's strict-clean. `get_info` always decodes leniently
    /// regardless of this field, so callers always get a filename list
    /// back even for a truncated or inconsistent archive.
    pub invalid: Option<String>,
}

impl ArchiveInfo {
    /// `name_mode` controls how `entries[].name` is rendered: hex mode
    /// surfaces the raw on-archive bytes as lowercase Base16 (spec §4.2,
    /// §6), the same split `extract::resolved_filename` makes at the
    /// filesystem boundary.
    fn from_archive(archive: &Archive, name_mode: NameMode) -> Self {
        ArchiveInfo {
            format: archive.format,
            archive_size: archive.file_size,
            entry_count: archive.observed_entry_count,
            header_size: archive.observed_header_size(),
            entries: archive
                .entries
                .iter()
                .map(|e| EntryInfo {
                    name: match name_mode {
                        NameMode::Hex => crate::name::hex_encode(&e.name),
                        _ => String::from_utf8_lossy(&e.name).into_owned(),
                    },
                    offset: e.offset,
                    size: e.size,
                })
                .collect(),
            invalid: None,
        }
    }
}

/// reports an archive's header fields and entry names without extracting
/// anything. always decodes leniently: a truncated or strict-inconsistent
/// archive still yields whatever the walker could recover, with `invalid`
/// set to describe why strict mode would have rejected it.
pub fn get_info(
    archive_path: &Path,
    dir_entry_len_fixed: Option<u32>,
    fn_hex: bool,
) -> Result<ArchiveInfo> {
    let (archive, lenient_warnings, _file) =
        decode(archive_path, dir_entry_len_fixed, fn_hex, ValidationMode::Lenient)?;

    let mut info = ArchiveInfo::from_archive(&archive, name_mode(fn_hex));
    if let Some(first) = lenient_warnings.first() {
        info.invalid = Some(first.to_string());
    }
    Ok(info)
}
