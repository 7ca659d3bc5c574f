use crate::error::Result;
use path_clean::PathClean;
use std::fs;
use std::path::{Path, PathBuf};

/// Checks if the given path exists and is accessible.
///
/// # Errors
/// Returns the underlying I/O error if the path does not exist or cannot be read.
pub fn check_path(path: &Path) -> Result<()> {
    fs::metadata(path)?;
    Ok(())
}

/// Expands a leading `~` or `$HOME`, makes the path absolute against `base`
/// and resolves `.` and `..` segments lexically.
pub fn expand_path(input: &Path, base: &Path) -> PathBuf {
    let expanded = PathBuf::from(expand_home(&input.to_string_lossy()));
    let abs_path = if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    };
    abs_path.clean()
}

fn expand_home(input: &str) -> String {
    if input.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return input.replacen('~', &home.to_string_lossy(), 1);
        }
    } else if input.starts_with("$HOME") {
        if let Some(home) = dirs::home_dir() {
            return input.replacen("$HOME", &home.to_string_lossy(), 1);
        }
    }
    input.into()
}
