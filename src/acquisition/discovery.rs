//! Session-file discovery

use std::path::{Path, PathBuf};

use tracing::info;

use super::LoadError;

/// Regular files in `folder` whose name contains `extension`, sorted by
/// file name so that file indices are stable across runs.
pub fn list_session_files(folder: &Path, extension: &str) -> Result<Vec<PathBuf>, LoadError> {
    if !folder.is_dir() {
        return Err(LoadError::NotAFolder(folder.to_path_buf()));
    }
    let entries = std::fs::read_dir(folder).map_err(|source| LoadError::Io {
        path: folder.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: folder.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains(extension));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    info!(folder = %folder.display(), files = files.len(), "Discovered session files");
    Ok(files)
}

/// File name up to the first `.`: `"well_A.run1.npz"` → `"well_A"`.
pub fn session_stem(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .map(|n| n.split('.').next().unwrap_or_default().to_string())
        .unwrap_or_default()
}
