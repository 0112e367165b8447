//! Path utilities: expand ~ and resolve backup destinations.

use std::path::{Path, PathBuf};

pub fn expand_tilde(path: &str) -> PathBuf {
    if path.starts_with("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(path.trim_start_matches("~/"));
    }
    PathBuf::from(path)
}

/// `<dir>/<stamp>-<scope>.json`, with the scope reduced to file-safe characters.
pub fn backup_file_path(dir: &Path, stamp: &str, scope: &str) -> PathBuf {
    let safe: String = scope
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    dir.join(format!("{stamp}-{safe}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_file_name_is_sanitized() {
        let p = backup_file_path(Path::new("/tmp/b"), "20250101_120000", "range 2025-01-01:2025-01-31");
        assert_eq!(
            p,
            PathBuf::from("/tmp/b/20250101_120000-range_2025_01_01_2025_01_31.json")
        );
    }
}
