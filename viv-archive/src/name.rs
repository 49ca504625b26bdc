//! entry name policy: character whitelist, reserved names, hex escaping,
//! and auto-rename on output collision (spec §4.2)

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const RESERVED_STEMS: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

const MAX_RENAME_ATTEMPTS: u32 = 1000;

/// how the raw on-disk name bytes are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameMode {
    #[default]
    Default,
    /// names round-trip as lowercase base16 of their raw bytes; character
    /// and reserved-name policy are bypassed.
    Hex,
    /// accept any byte sequence the caller-supplied validator accepts,
    /// subject still to length and trailing-character rules.
    #[cfg(feature = "utf8-names")]
    Utf8,
}

/// cheap per-byte test used by the directory walker to decide, while
/// scanning forward for a name's terminating NUL, whether the byte it just
/// read disqualifies what's been read so far as a name (spec §4.4 step 3).
/// only meaningful for `NameMode::Default`: hex mode never rejects a byte
/// mid-scan, and utf-8 mode can only be judged once the whole candidate
/// name is known.
pub fn scan_reject(b: u8, mode: NameMode) -> bool {
    match mode {
        NameMode::Default => !is_allowed_char(b),
        NameMode::Hex => false,
        #[cfg(feature = "utf8-names")]
        NameMode::Utf8 => false,
    }
}

pub fn is_allowed_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-' | b' ')
}

/// full structural validation of a resolved name (NUL already stripped).
///
/// `is_valid_utf8` is the external collaborator spec §1 calls out
/// ("assume an external `is_valid_utf8(bytes) -> bool`"); it's only
/// consulted when `mode` is `NameMode::Utf8`.
pub fn validate_name(
    name: &[u8],
    mode: NameMode,
    #[cfg_attr(not(feature = "utf8-names"), allow(unused_variables))] is_valid_utf8: Option<
        fn(&[u8]) -> bool,
    >,
) -> Result<()> {
    if name.is_empty() {
        return Err(Error::NameInvalid("name is empty".into()));
    }
    if name.len() > 254 {
        return Err(Error::NameInvalid(format!(
            "name is {} bytes, the on-disk limit (including the terminating NUL) is 255",
            name.len()
        )));
    }
    if name.contains(&b'/') || name.contains(&b'\\') || name.contains(&0u8) {
        return Err(Error::NameInvalid(
            "path separators and embedded NUL are never allowed".into(),
        ));
    }

    match mode {
        NameMode::Hex => return Ok(()),
        NameMode::Default => {
            if let Some(&bad) = name.iter().find(|&&b| !is_allowed_char(b)) {
                return Err(Error::NameInvalid(format!(
                    "byte 0x{bad:02x} is outside the allowed character set"
                )));
            }
        }
        #[cfg(feature = "utf8-names")]
        NameMode::Utf8 => {
            let accepted = is_valid_utf8.map(|f| f(name)).unwrap_or(false);
            if !accepted {
                return Err(Error::NameInvalid("not a valid utf-8 name".into()));
            }
        }
    }

    if matches!(name.last(), Some(b'.') | Some(b',') | Some(b';') | Some(b' ')) {
        return Err(Error::NameInvalid(
            "name must not end in '.', ',', ';' or a space".into(),
        ));
    }

    let stem = match name.iter().rposition(|&b| b == b'.') {
        Some(idx) => &name[..idx],
        None => name,
    };
    if let Ok(stem) = std::str::from_utf8(stem) {
        if RESERVED_STEMS.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
            return Err(Error::NameInvalid(format!(
                "'{stem}' is a reserved device name"
            )));
        }
    }

    Ok(())
}

pub fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(out, "{b:02x}").expect("writing to a String never fails");
    }
    out
}

pub fn hex_decode(s: &str) -> Result<Vec<u8>> {
    fn nibble(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    }

    let bytes = s.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err(Error::NameInvalid(
            "hex-encoded name has an odd number of digits".into(),
        ));
    }

    let mut out = Vec::with_capacity(bytes.len() / 2);
    for pair in bytes.chunks_exact(2) {
        let (hi, lo) = (nibble(pair[0]), nibble(pair[1]));
        match (hi, lo) {
            (Some(hi), Some(lo)) => out.push((hi << 4) | lo),
            _ => return Err(Error::NameInvalid(format!("invalid hex digit in {s:?}"))),
        }
    }
    Ok(out)
}

/// find a free path by appending `_N` before the extension, `N` from 1 to
/// 1000. Returns `None` if every candidate in that range is taken.
pub fn resolve_collision(path: &Path) -> Option<PathBuf> {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path.file_stem()?.to_string_lossy().into_owned();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

    for n in 1..=MAX_RENAME_ATTEMPTS {
        let candidate_name = match &ext {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        };
        let candidate = parent.join(candidate_name);
        if !candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trips_arbitrary_bytes() {
        let bytes: Vec<u8> = (0..=255).collect();
        let encoded = hex_encode(&bytes);
        assert!(encoded.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
        assert_eq!(hex_decode(&encoded).unwrap(), bytes);
    }

    #[test]
    fn rejects_odd_length_hex() {
        assert!(hex_decode("abc").is_err());
    }

    #[test]
    fn rejects_non_hex_digits() {
        assert!(hex_decode("zz").is_err());
    }

    #[test]
    fn default_mode_accepts_plain_names() {
        validate_name(b"README.txt", NameMode::Default, None).unwrap();
    }

    #[test]
    fn default_mode_rejects_trailing_dot() {
        assert!(validate_name(b"foo.", NameMode::Default, None).is_err());
    }

    #[test]
    fn default_mode_rejects_reserved_stem_case_insensitive() {
        assert!(validate_name(b"con.txt", NameMode::Default, None).is_err());
        assert!(validate_name(b"CON", NameMode::Default, None).is_err());
        assert!(validate_name(b"console.txt", NameMode::Default, None).is_ok());
    }

    #[test]
    fn rejects_path_separators_in_any_mode() {
        assert!(validate_name(b"a/b", NameMode::Default, None).is_err());
        assert!(validate_name(b"a\\b", NameMode::Hex, None).is_err());
    }

    #[test]
    fn hex_mode_bypasses_character_policy() {
        let weird = [0x00u8 + 1, 0xFF, b'/' /* still illegal, see below */];
        // hex mode bypasses character + reserved-name policy, but '/' is
        // still always rejected regardless of mode.
        assert!(validate_name(&weird, NameMode::Hex, None).is_err());
        assert!(validate_name(&[0x01u8, 0xFF, 0x02], NameMode::Hex, None).is_ok());
    }

    #[test]
    fn resolve_collision_picks_first_free_suffix() {
        let dir = std::env::temp_dir().join(format!("viv-archive-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let target = dir.join("a.txt");
        std::fs::write(&target, b"1").unwrap();
        std::fs::write(dir.join("a_1.txt"), b"2").unwrap();

        let resolved = resolve_collision(&target).unwrap();
        assert_eq!(resolved, dir.join("a_2.txt"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
