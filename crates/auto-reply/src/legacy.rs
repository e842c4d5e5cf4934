use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Summary of a startup load of existing room logs.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LegacyReport {
    pub loaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// `*.txt` logs in `dir` as `(channel, path)` pairs sorted by channel.
pub(crate) fn room_logs(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = std::fs::read_dir(dir).map_err(|source| Error::LogDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut logs: Vec<(String, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            let stem = name.strip_suffix(".txt")?.to_owned();
            Some((stem, e.path()))
        })
        .collect();
    logs.sort();
    Ok(logs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_txt_logs_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("matrix_b.txt"), "").unwrap();
        std::fs::write(dir.path().join("matrix_a.txt"), "").unwrap();
        std::fs::write(dir.path().join("README"), "").unwrap();
        let logs = room_logs(dir.path()).unwrap();
        let names: Vec<&str> = logs.iter().map(|(stem, _)| stem.as_str()).collect();
        assert_eq!(names, vec!["matrix_a", "matrix_b"]);
        assert_eq!(logs[0].1, dir.path().join("matrix_a.txt"));
    }

    #[test]
    fn missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = room_logs(&dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, Error::LogDir { .. }));
    }
}
