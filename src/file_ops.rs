use crate::error::InvalidInput;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

/// Opens `path` for hashing and returns the handle with the size it had at open time.
/// Anything other than an existing, readable, regular file is rejected.
pub fn open_regular_file(path: &Path) -> Result<(File, u64), InvalidInput> {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(InvalidInput::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(InvalidInput::Unreadable { path: path.to_path_buf(), source });
        }
    };
    if !meta.is_file() {
        return Err(InvalidInput::NotAFile(path.to_path_buf()));
    }
    let f = File::open(path)
        .map_err(|source| InvalidInput::Unreadable { path: path.to_path_buf(), source })?;
    Ok((f, meta.len()))
}

/// `floor(read * 100 / total)`, capped at 100. An empty file is complete from the start.
pub fn percent_complete(read: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (read as u128 * 100) / total as u128;
    pct.min(100) as u8
}
