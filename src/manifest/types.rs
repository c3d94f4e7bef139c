use serde::{Deserialize, Serialize};

/// Note recorded when a declared id failed format validation and was
/// stripped during staging.
pub const NOTE_SANITIZED_INVALID_FORMAT: &str = "sanitized-invalid-format";

/// Note recorded when an existing id forced by the preserve policy failed
/// format validation and was cleared instead.
pub const NOTE_SANITIZED_EXISTING_INVALID: &str = "sanitized-existing-invalid";

/// Note recorded when a second staged file declared an id already claimed
/// by an earlier file targeting a different folder.
pub const NOTE_STAGED_DUPLICATE_CONFLICT: &str = "staged-duplicate-conflict";

/// How a staged workflow was matched to an existing remote workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MatchType {
    /// Declared id found in the pre-import snapshot.
    #[serde(rename = "id")]
    Id,
    /// Matched via the instance marker embedded in the file.
    #[serde(rename = "instanceId")]
    InstanceId,
    /// Matched by name with agreeing (or absent) folder location.
    #[serde(rename = "name")]
    Name,
    /// Matched against the prior-run manifest by normalized path.
    #[serde(rename = "path")]
    Path,
    /// Prior-run manifest name fallback, most recently updated entry.
    #[serde(rename = "name-newest")]
    NameNewest,
    /// No identity match; the remote assigns a fresh id on import.
    #[serde(rename = "none")]
    #[default]
    None,
}

/// Durable record of one staging decision; one NDJSON line per entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestEntry {
    /// Filename of the staged copy inside the per-run staging directory.
    pub file_name: String,
    /// Final workflow id; absent until the remote has assigned one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Id declared by the source file before any sanitation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_id: Option<String>,
    pub match_type: MatchType,
    /// Existing remote workflow this file was aligned to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_id: Option<String>,
    /// Workflow name; needed for name-based reconciliation.
    pub name: String,
    /// Top-level directory segment (the project) the file came from.
    pub project: String,
    /// Directory segments below the project, display-cased, `/`-joined.
    /// Empty for files directly under the project directory.
    pub folder_path: String,
    /// Path of the source file relative to the backup root; the path
    /// lookup key for the next run.
    pub source_path: String,
    /// Why the id was kept, cleared, or rewritten.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// RFC 3339; the "most recently updated" tie-break basis.
    pub updated_at: String,
}

impl ManifestEntry {
    /// Target path of this entry as `<project>/<folder path>`, display form.
    #[must_use]
    pub fn target_path(&self) -> String {
        if self.folder_path.is_empty() {
            self.project.clone()
        } else {
            format!("{}/{}", self.project, self.folder_path)
        }
    }
}
