use std::path::{Path, PathBuf};

pub fn is_file(path: &str) -> Result<PathBuf, String> {
    let path = Path::new(path);
    if !path.is_file() {
        return Err("You need to pass a valid file path.".to_owned());
    }
    Ok(path.to_path_buf())
}

pub fn fixed_entry_len(s: &str) -> Result<u32, String> {
    let n: u32 = s.parse().map_err(|_| "expected an integer".to_owned())?;
    if n < 10 {
        return Err("fixed directory entry length must be at least 10".to_owned());
    }
    Ok(n)
}

pub fn alignment(s: &str) -> Result<u32, String> {
    let n: u32 = s.parse().map_err(|_| "expected an integer".to_owned())?;
    if !matches!(n, 0 | 2 | 4 | 8 | 16) {
        return Err("alignment must be one of 0, 2, 4, 8, 16".to_owned());
    }
    Ok(n)
}
