use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::utils::CREDENTIALS_FILE_NAME;

use super::StageError;

/// A workflow JSON file discovered under the backup root.
///
/// The directory layout carries the restore target: the first path segment
/// names the project and the remaining directories form the folder path.
/// Files sitting directly in the backup root have no project segment and
/// land in the default project.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    /// Absolute path of the file on disk
    pub absolute_path: PathBuf,
    /// Path relative to the backup root, joined with `/`
    pub relative_path: String,
    /// First directory segment, absent for files at the root
    pub project_segment: Option<String>,
    /// Directory segments between the project and the file
    pub folder_segments: Vec<String>,
    /// File name including the extension
    pub file_name: String,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Walk the backup root and collect every workflow JSON file.
///
/// Hidden files and directories are skipped, as is the decrypted
/// credentials export at the root. Traversal is sorted by file name so
/// repeated runs stage files in the same order.
pub fn scan_backup_root(root: &Path) -> Result<Vec<ScannedFile>, StageError> {
    if !root.is_dir() {
        return Err(StageError::MissingRoot(root.to_path_buf()));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry));

    for entry in walker {
        let entry = entry.map_err(|source| StageError::Scan {
            root: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            warn!(
                path = %entry.path().display(),
                "Skipping file with a non-UTF-8 name"
            );
            continue;
        };
        if !name.to_ascii_lowercase().ends_with(".json") {
            continue;
        }
        if entry.depth() == 1 && name == CREDENTIALS_FILE_NAME {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        let Some((file_name, dirs)) = segments.split_last() else {
            continue;
        };

        files.push(ScannedFile {
            absolute_path: entry.path().to_path_buf(),
            relative_path: segments.join("/"),
            project_segment: dirs.first().cloned(),
            folder_segments: dirs.get(1..).unwrap_or_default().to_vec(),
            file_name: file_name.clone(),
        });
    }

    debug!(count = files.len(), root = %root.display(), "Scanned backup root");
    Ok(files)
}
