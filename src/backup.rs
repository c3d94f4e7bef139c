//! The backup pipeline.
//!
//! Exports every workflow through the engine, arranges the files into a
//! `<project>/<folder>/.../<name>.json` tree using the locations the
//! remote reports, and writes the manifest artifact the next restore run
//! keys its identity matching off. Credentials ride along in encrypted
//! form when enabled, and the remote storage mode commits and pushes the
//! tree afterwards.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::api::RemoteApi;
use crate::cache::{CacheError, RemoteStateCache};
use crate::config::{BackupConfig, StorageMode};
use crate::engine::{EngineCommands, EngineError};
use crate::git::{self, GitError};
use crate::manifest::{ManifestEntry, ManifestError, ManifestStore, MatchType};
use crate::text::fs_safe_name;
use crate::utils::{format_display_path, manifest_path, now_iso, CREDENTIALS_FILE_NAME};
use crate::workflow_file::WorkflowDoc;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Workflow export failed: {0}")]
    Export(#[from] EngineError),

    #[error("Credential export failed: {0}")]
    Credentials(#[source] EngineError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("Failed to write the backup tree: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// Caller-facing knobs for one backup run.
#[derive(Debug, Clone)]
pub struct BackupOptions {
    pub include_credentials: bool,
    pub storage: StorageMode,
    pub git_remote: String,
    pub git_branch: String,
}

impl Default for BackupOptions {
    fn default() -> Self {
        BackupOptions {
            include_credentials: false,
            storage: StorageMode::default(),
            git_remote: "origin".to_string(),
            git_branch: "main".to_string(),
        }
    }
}

impl From<&BackupConfig> for BackupOptions {
    fn from(config: &BackupConfig) -> Self {
        BackupOptions {
            include_credentials: config.include_credentials,
            storage: config.storage,
            git_remote: config.git_remote.clone(),
            git_branch: config.git_branch.clone(),
        }
    }
}

/// Everything a finished run reports.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackupSummary {
    pub exported: usize,
    pub skipped: usize,
    /// Workflows the remote reported no location for; they land under the
    /// default project directory.
    pub unplaced: usize,
    pub credentials_included: bool,
    pub committed: bool,
    pub pushed: bool,
    pub duration: Duration,
}

impl fmt::Display for BackupSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = Duration::from_millis(self.duration.as_millis() as u64);
        writeln!(
            f,
            "Backup finished in {}",
            humantime::format_duration(rounded)
        )?;
        write!(f, "  exported:   {}", self.exported)?;
        if self.skipped > 0 {
            write!(f, " ({} skipped)", self.skipped)?;
        }
        if self.unplaced > 0 {
            write!(f, "\n  unplaced:   {}", self.unplaced)?;
        }
        if self.credentials_included {
            write!(f, "\n  credentials exported")?;
        }
        if self.pushed {
            write!(f, "\n  committed and pushed")?;
        } else if self.committed {
            write!(f, "\n  committed locally")?;
        }
        Ok(())
    }
}

async fn collect_exports(dir: &Path) -> Result<Vec<PathBuf>, BackupError> {
    let mut files = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        {
            files.push(path);
        }
    }
    // A stable order keeps duplicate-name suffixes deterministic.
    files.sort();
    Ok(files)
}

/// Back up the live instance into `backup_root`.
///
/// Fatal errors are the ones that invalidate the whole run: an unreachable
/// remote, a failed export, or a failed commit. A single unreadable export
/// file is logged and skipped.
pub async fn run_backup(
    api: &dyn RemoteApi,
    engine: &dyn EngineCommands,
    backup_root: &Path,
    opts: &BackupOptions,
) -> Result<BackupSummary, BackupError> {
    let started = Instant::now();
    if opts.storage == StorageMode::Disabled {
        warn!("Backup storage is disabled; nothing to do");
        return Ok(BackupSummary {
            duration: started.elapsed(),
            ..BackupSummary::default()
        });
    }
    info!(
        root = %format_display_path(&backup_root.display().to_string()),
        storage = ?opts.storage,
        "Starting backup"
    );

    let cache = RemoteStateCache::load_from_api(api).await?;

    let export_dir = TempDir::new()?;
    engine.export_workflows_separate(export_dir.path()).await?;
    let exports = collect_exports(export_dir.path()).await?;
    if exports.is_empty() {
        warn!("The instance reported no workflows; leaving the backup untouched");
        return Ok(BackupSummary {
            duration: started.elapsed(),
            ..BackupSummary::default()
        });
    }
    debug!(count = exports.len(), "Collected exported workflows");

    fs::create_dir_all(backup_root).await?;
    let mut store = ManifestStore::new(manifest_path(backup_root));

    let default_project = cache
        .project_display_name(cache.default_project_id())
        .unwrap_or(cache.default_project_id())
        .to_string();

    let mut used_paths: HashSet<PathBuf> = HashSet::new();
    let mut exported = 0usize;
    let mut skipped = 0usize;
    let mut unplaced = 0usize;

    for path in &exports {
        let doc = match WorkflowDoc::load(path).await {
            Ok(doc) => doc,
            Err(err) => {
                warn!(
                    file = %path.display(),
                    error = %err,
                    "Skipping unreadable export"
                );
                skipped += 1;
                continue;
            }
        };
        let id = doc.declared_id().map(str::to_string);
        let name = doc
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| "unnamed".to_string());

        let target_display = id
            .as_deref()
            .and_then(|id| cache.workflow_relative_path(id))
            .unwrap_or_else(|| {
                unplaced += 1;
                debug!(
                    workflow = %name,
                    "No recorded location; placing under the default project"
                );
                default_project.clone()
            });

        let segments: Vec<String> = target_display
            .split('/')
            .filter(|s| !s.is_empty())
            .map(fs_safe_name)
            .collect();
        let mut dir = backup_root.to_path_buf();
        for segment in &segments {
            dir.push(segment);
        }
        fs::create_dir_all(&dir).await?;

        let stem = fs_safe_name(&name);
        let mut file_name = format!("{stem}.json");
        let mut counter = 2;
        while !used_paths.insert(dir.join(&file_name)) {
            file_name = format!("{stem}-{counter}.json");
            counter += 1;
        }
        fs::write(dir.join(&file_name), doc.to_json_string()?).await?;

        let source_path = if segments.is_empty() {
            file_name.clone()
        } else {
            format!("{}/{}", segments.join("/"), file_name)
        };
        let (project, folder_path) = match segments.split_first() {
            Some((first, rest)) => (first.clone(), rest.join("/")),
            None => (default_project.clone(), String::new()),
        };

        store.upsert(ManifestEntry {
            file_name,
            id: id.clone(),
            original_id: None,
            match_type: if id.is_some() {
                MatchType::Id
            } else {
                MatchType::None
            },
            existing_id: id,
            name,
            project,
            folder_path,
            source_path,
            note: None,
            updated_at: now_iso(),
        });
        exported += 1;
    }

    store.flush().await?;
    debug!(entries = store.len(), "Wrote the manifest artifact");

    let mut credentials_included = false;
    if opts.include_credentials {
        engine
            .export_credentials(&backup_root.join(CREDENTIALS_FILE_NAME))
            .await
            .map_err(BackupError::Credentials)?;
        credentials_included = true;
        info!("Exported credentials in encrypted form");
    }

    let mut committed = false;
    let mut pushed = false;
    if opts.storage == StorageMode::Remote {
        if !git::is_git_repository(backup_root) {
            warn!(
                root = %backup_root.display(),
                "Backup root is not a git repository; skipping commit and push"
            );
        } else if git::has_changes(backup_root)? {
            let message = format!("flowvault backup {}", now_iso());
            git::commit_all(backup_root, &message)?;
            committed = true;
            git::push(backup_root, &opts.git_remote, &opts.git_branch)?;
            pushed = true;
            info!(
                remote = %opts.git_remote,
                branch = %opts.git_branch,
                "Pushed backup"
            );
        } else {
            info!("No changes since the last backup; nothing to commit");
        }
    }

    let summary = BackupSummary {
        exported,
        skipped,
        unplaced,
        credentials_included,
        committed,
        pushed,
        duration: started.elapsed(),
    };
    info!(
        exported = summary.exported,
        skipped = summary.skipped,
        "Backup complete"
    );
    Ok(summary)
}

#[cfg(test)]
#[path = "backup_tests.rs"]
mod tests;
