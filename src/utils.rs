use std::path::Path;

/// Manifest artifact written next to the backed-up workflow files
pub const MANIFEST_FILE_NAME: &str = ".flowvault-manifest.ndjson";

/// Decrypted credentials export inside the backup root
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Get the path to the manifest artifact inside a backup root
#[must_use]
pub fn manifest_path(backup_root: &Path) -> std::path::PathBuf {
    backup_root.join(MANIFEST_FILE_NAME)
}

/// Get current timestamp in ISO 8601 format
#[must_use]
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Format a path for display, replacing home directory with ~/
#[must_use]
pub fn format_display_path(path: &str) -> String {
    replace_homedir::replace_homedir(path, "~")
}
