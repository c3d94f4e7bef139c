//! The restore pipeline, end to end.
//!
//! Order of operations: scan the backup root, load the remote state cache
//! and a pre-import snapshot, stage every file, import credentials when the
//! backup carries them, import the staged copies, capture a post-import
//! snapshot, reconcile the manifest against it, and finally synchronize
//! folders with a freshly reloaded cache. The working
//! manifest lives in the staging area during the run and replaces the
//! backup root's manifest artifact once the run completes, so a crashed
//! run never corrupts the durable record.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::api::RemoteApi;
use crate::cache::{CacheError, RemoteStateCache};
use crate::config::{self, ConfigError, RestoreConfig};
use crate::engine::{EngineCommands, EngineError};
use crate::foldersync::sync_folders;
use crate::manifest::{ManifestError, ManifestStore};
use crate::reconcile::reconcile;
use crate::snapshot::{self, SnapshotError};
use crate::staging::{scan_backup_root, stage_all, IdPolicy, StageError, StageOptions};
use crate::utils::{format_display_path, manifest_path, CREDENTIALS_FILE_NAME};

#[derive(Error, Debug)]
pub enum RestoreError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("Workflow import failed: {0}")]
    Import(#[from] EngineError),

    #[error("Credential import failed: {0}")]
    Credentials(#[source] EngineError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Failed to prepare the staging area: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Caller-facing knobs for one restore run.
#[derive(Debug, Clone)]
pub struct RestoreOptions {
    pub policy: IdPolicy,
    pub allow_unanchored_name_match: bool,
    /// Preserve the staging area (staged copies plus the run manifest)
    /// under the flowvault home for debugging.
    pub keep_manifest: bool,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        RestoreOptions {
            policy: IdPolicy::default(),
            allow_unanchored_name_match: true,
            keep_manifest: false,
        }
    }
}

impl From<&RestoreConfig> for RestoreOptions {
    fn from(config: &RestoreConfig) -> Self {
        RestoreOptions {
            policy: config.id_policy,
            allow_unanchored_name_match: config.allow_unanchored_name_match,
            keep_manifest: config.keep_manifest,
        }
    }
}

/// Everything a finished run reports.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    pub staged: usize,
    pub skipped: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub projects_created: usize,
    pub folders_created: usize,
    pub workflows_reassigned: usize,
    pub sync_skipped: usize,
    pub credentials_imported: bool,
    pub duration: Duration,
    /// Set when the staging area was preserved for debugging.
    pub staging_kept: Option<PathBuf>,
}

impl fmt::Display for RestoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = Duration::from_millis(self.duration.as_millis() as u64);
        writeln!(
            f,
            "Restore finished in {}",
            humantime::format_duration(rounded)
        )?;
        writeln!(f, "  staged:     {} ({} skipped)", self.staged, self.skipped)?;
        writeln!(f, "  created:    {}", self.created)?;
        writeln!(f, "  updated:    {}", self.updated)?;
        writeln!(f, "  unchanged:  {}", self.unchanged)?;
        if self.deleted > 0 {
            writeln!(f, "  deleted:    {}", self.deleted)?;
        }
        writeln!(f, "  projects:   {} created", self.projects_created)?;
        writeln!(f, "  folders:    {} created", self.folders_created)?;
        write!(f, "  reassigned: {}", self.workflows_reassigned)?;
        if self.sync_skipped > 0 {
            write!(f, " ({} sync failures)", self.sync_skipped)?;
        }
        if self.credentials_imported {
            write!(f, "\n  credentials imported")?;
        }
        if let Some(path) = &self.staging_kept {
            let shown = format_display_path(&path.display().to_string());
            write!(f, "\n  staging kept at {shown}")?;
        }
        Ok(())
    }
}

enum StagingArea {
    Temp(TempDir),
    Kept(PathBuf),
}

impl StagingArea {
    fn path(&self) -> &Path {
        match self {
            StagingArea::Temp(dir) => dir.path(),
            StagingArea::Kept(path) => path,
        }
    }
}

async fn prepare_staging(keep: bool) -> Result<StagingArea, RestoreError> {
    if keep {
        let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
        let dir = config::flowvault_home()?
            .join("staging")
            .join(stamp.to_string());
        fs::create_dir_all(&dir).await?;
        Ok(StagingArea::Kept(dir))
    } else {
        Ok(StagingArea::Temp(TempDir::new()?))
    }
}

/// Run a restore of `backup_root` against the live instance.
///
/// Fatal errors are the ones that invalidate the whole batch: no projects
/// on the remote, no usable snapshot tier, an unreachable engine command,
/// or a failed import. Everything per-file is logged, skipped, and counted.
pub async fn run_restore(
    api: &dyn RemoteApi,
    engine: &dyn EngineCommands,
    backup_root: &Path,
    opts: &RestoreOptions,
) -> Result<RestoreSummary, RestoreError> {
    let started = Instant::now();
    info!(
        root = %format_display_path(&backup_root.display().to_string()),
        policy = ?opts.policy,
        "Starting restore"
    );

    let files = scan_backup_root(backup_root)?;
    if files.is_empty() {
        warn!(
            root = %backup_root.display(),
            "No workflow files found; nothing to restore"
        );
        return Ok(RestoreSummary {
            duration: started.elapsed(),
            ..RestoreSummary::default()
        });
    }
    info!(count = files.len(), "Collected workflow files");

    let mut cache = RemoteStateCache::load_from_api(api).await?;
    let (pre, pre_source) = snapshot::capture(api, engine, &cache).await?;
    debug!(
        workflows = pre.len(),
        source = ?pre_source,
        "Captured pre-import snapshot"
    );

    let prior = ManifestStore::load(&manifest_path(backup_root)).await?;
    if !prior.is_empty() {
        debug!(entries = prior.len(), "Loaded the prior manifest");
    }

    let staging = prepare_staging(opts.keep_manifest).await?;
    let staged_dir = staging.path().join("workflows");
    let mut store = ManifestStore::new(staging.path().join("manifest.ndjson"));

    let stage_opts = StageOptions {
        policy: opts.policy,
        allow_unanchored_name_match: opts.allow_unanchored_name_match,
    };
    let stats = stage_all(
        &files,
        &cache,
        &pre,
        &prior,
        &mut store,
        &staged_dir,
        &stage_opts,
    )
    .await?;
    if store.is_empty() {
        warn!("Every workflow file was skipped; nothing to import");
        return Ok(RestoreSummary {
            skipped: stats.skipped,
            duration: started.elapsed(),
            ..RestoreSummary::default()
        });
    }
    store.flush().await?;

    // Credentials go in first so imported workflows find their references.
    let credentials = backup_root.join(CREDENTIALS_FILE_NAME);
    let mut credentials_imported = false;
    if credentials.is_file() {
        engine
            .import_credentials(&credentials)
            .await
            .map_err(RestoreError::Credentials)?;
        credentials_imported = true;
        info!("Imported credentials from the backup root");
    }

    engine.import_workflows(&staged_dir).await?;
    info!(count = store.len(), "Imported staged workflows");

    let (post, post_source) = snapshot::capture(api, engine, &cache).await?;
    debug!(
        workflows = post.len(),
        source = ?post_source,
        "Captured post-import snapshot"
    );

    let outcome = reconcile(&pre, &post, &mut store);
    store.flush().await?;

    // Folder sync needs the folders and placements the import just
    // produced; refresh when possible, degrade to the pre-import view
    // otherwise.
    match RemoteStateCache::load_from_api(api).await {
        Ok(fresh) => cache = fresh,
        Err(err) => warn!(
            error = %err,
            "Could not refresh remote state after import; folder sync uses the pre-import view"
        ),
    }
    let sync = sync_folders(api, &mut cache, &store).await;

    fs::copy(store.path(), manifest_path(backup_root)).await?;
    debug!("Updated the manifest artifact at the backup root");

    let staging_kept = match staging {
        StagingArea::Kept(path) => {
            info!(path = %format_display_path(&path.display().to_string()), "Staging area kept");
            Some(path)
        }
        StagingArea::Temp(_) => None,
    };

    let summary = RestoreSummary {
        staged: stats.staged,
        skipped: stats.skipped,
        created: outcome.created,
        updated: outcome.updated,
        unchanged: outcome.unchanged,
        deleted: outcome.deleted,
        projects_created: sync.projects_created,
        folders_created: sync.folders_created,
        workflows_reassigned: sync.workflows_reassigned,
        sync_skipped: sync.skipped,
        credentials_imported,
        duration: started.elapsed(),
        staging_kept,
    };
    info!(
        duration = %humantime::format_duration(Duration::from_millis(
            summary.duration.as_millis() as u64
        )),
        "Restore complete"
    );
    Ok(summary)
}
