//! Snapshot Service: point-in-time captures of the remote workflow list.
//!
//! A snapshot is taken once before import and once after; the reconciler
//! diffs the two. Capture goes through the API when possible, because only
//! the API reports folder placement; when the API is unreachable the
//! engine's own export command is used instead, which still yields ids,
//! names, and instance markers.

use crate::api::{ApiError, Listing, RemoteApi, RemoteWorkflow};
use crate::cache::RemoteStateCache;
use crate::engine::{EngineCommands, EngineError};
use crate::text::comparison_key;
use crate::workflow_file::WorkflowDoc;
use serde_json::Value;
use std::collections::HashSet;
use tempfile::TempDir;
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Engine export failed: {0}")]
    Export(#[from] EngineError),

    #[error("Failed to read export file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Snapshot unavailable; API failed ({api}) and export fallback failed ({fallback})")]
    Unavailable {
        api: ApiError,
        #[source]
        fallback: Box<SnapshotError>,
    },
}

/// How a snapshot was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    Api,
    Export,
}

/// One remote workflow as seen at capture time.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub id: String,
    pub name: String,
    pub instance_marker: Option<String>,
    /// `<project>/<folder path>` in display casing. Absent for rows captured
    /// via the export fallback, which carries no placement information.
    pub relative_path: Option<String>,
}

/// Immutable point-in-time list of remote workflows, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    rows: Vec<SnapshotRow>,
}

impl Snapshot {
    /// Rows are sorted by id so every downstream candidate scan is
    /// deterministic regardless of remote listing order.
    #[must_use]
    pub fn from_rows(mut rows: Vec<SnapshotRow>) -> Self {
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        Snapshot { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[SnapshotRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn ids(&self) -> HashSet<&str> {
        self.rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&SnapshotRow> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// All rows carrying the given instance marker, in id order.
    #[must_use]
    pub fn find_by_marker(&self, marker: &str) -> Vec<&SnapshotRow> {
        self.rows
            .iter()
            .filter(|r| r.instance_marker.as_deref() == Some(marker))
            .collect()
    }

    /// All rows whose name matches case- and whitespace-insensitively, in
    /// id order.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Vec<&SnapshotRow> {
        let key = comparison_key(name);
        self.rows
            .iter()
            .filter(|r| comparison_key(&r.name) == key)
            .collect()
    }
}

/// Resolve a listed workflow's `<project>/<folder path>` through the cache.
fn relative_path_for(cache: &RemoteStateCache, wf: &RemoteWorkflow) -> Option<String> {
    match &wf.folder_id {
        Some(folder_id) => {
            let folder_path = cache.folder_display_path(folder_id)?;
            let project_id = cache.folder_project(folder_id)?;
            let project = cache.project_display_name(project_id)?;
            Some(format!("{project}/{folder_path}"))
        }
        None => {
            let project_id = wf
                .project_id
                .as_deref()
                .unwrap_or_else(|| cache.default_project_id());
            cache.project_display_name(project_id).map(str::to_string)
        }
    }
}

/// Capture the current remote workflow list.
///
/// Tries the API first; on failure falls back to the engine's export
/// command through a scoped temp directory that is removed on every exit
/// path.
pub async fn capture(
    api: &dyn RemoteApi,
    engine: &dyn EngineCommands,
    cache: &RemoteStateCache,
) -> Result<(Snapshot, SnapshotSource), SnapshotError> {
    match api.list_workflows().await {
        Ok(workflows) => {
            let rows = workflows
                .iter()
                .map(|wf| SnapshotRow {
                    id: wf.id.clone(),
                    name: wf.name.clone(),
                    instance_marker: wf.instance_marker.clone(),
                    relative_path: relative_path_for(cache, wf),
                })
                .collect();
            let snapshot = Snapshot::from_rows(rows);
            info!("Captured snapshot of {} workflows via API", snapshot.len());
            Ok((snapshot, SnapshotSource::Api))
        }
        Err(api_err) => {
            warn!("API snapshot failed ({api_err}); falling back to engine export");
            match capture_via_export(engine).await {
                Ok(snapshot) => {
                    info!(
                        "Captured snapshot of {} workflows via engine export",
                        snapshot.len()
                    );
                    Ok((snapshot, SnapshotSource::Export))
                }
                Err(fallback) => Err(SnapshotError::Unavailable {
                    api: api_err,
                    fallback: Box::new(fallback),
                }),
            }
        }
    }
}

async fn capture_via_export(engine: &dyn EngineCommands) -> Result<Snapshot, SnapshotError> {
    let scratch = TempDir::new()?;
    let export_file = scratch.path().join("workflows-export.json");

    engine.export_workflows(&export_file).await?;

    if !export_file.exists() {
        // The engine exits cleanly without writing anything when the
        // instance holds no workflows.
        warn!("Engine export produced no file; treating snapshot as empty");
        return Ok(Snapshot::default());
    }

    let content = fs::read_to_string(&export_file).await?;
    let listing: Listing<Value> = serde_json::from_str(&content)?;

    let mut rows = Vec::new();
    for value in listing.into_vec() {
        let Ok(doc) = WorkflowDoc::from_value(value) else {
            warn!("Skipping non-object entry in export file");
            continue;
        };
        let Some(id) = doc.declared_id() else {
            warn!("Skipping exported workflow without an id");
            continue;
        };
        rows.push(SnapshotRow {
            id: id.to_string(),
            name: doc.name().unwrap_or_default().to_string(),
            instance_marker: doc.instance_marker().map(str::to_string),
            relative_path: None,
        });
    }

    Ok(Snapshot::from_rows(rows))
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
