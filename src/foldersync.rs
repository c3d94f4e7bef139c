//! Folder/Project Synchronizer: make the remote hierarchy match the
//! reconciled manifest.
//!
//! For each entry the target project is resolved or created, missing
//! folders along the target path are created parent-first, and the
//! workflow is moved when its current folder differs from the target.
//! A second pass over an already-synchronized instance applies nothing.

use tracing::{debug, info, warn};

use crate::api::{ApiError, RemoteApi};
use crate::cache::RemoteStateCache;
use crate::manifest::{ManifestEntry, ManifestStore};

/// Remote mutations applied by one sync pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    pub projects_created: usize,
    pub folders_created: usize,
    pub workflows_reassigned: usize,
    /// Entries that failed to apply and were skipped.
    pub skipped: usize,
}

/// Apply folder placement for every manifest entry.
///
/// Failures are per-entry: the entry is skipped with a warning and the
/// batch continues.
pub async fn sync_folders(
    api: &dyn RemoteApi,
    cache: &mut RemoteStateCache,
    store: &ManifestStore,
) -> SyncOutcome {
    let mut outcome = SyncOutcome::default();
    for entry in store.entries() {
        if let Err(err) = sync_entry(api, cache, entry, &mut outcome).await {
            warn!(
                workflow = %entry.name,
                target = %entry.target_path(),
                error = %err,
                "Skipping folder sync for this workflow"
            );
            outcome.skipped += 1;
        }
    }
    info!(
        projects_created = outcome.projects_created,
        folders_created = outcome.folders_created,
        workflows_reassigned = outcome.workflows_reassigned,
        skipped = outcome.skipped,
        "Folder synchronization complete"
    );
    outcome
}

async fn sync_entry(
    api: &dyn RemoteApi,
    cache: &mut RemoteStateCache,
    entry: &ManifestEntry,
    outcome: &mut SyncOutcome,
) -> Result<(), ApiError> {
    let Some(workflow_id) = entry.id.as_deref() else {
        debug!(workflow = %entry.name, "Entry carries no id; nothing to place");
        return Ok(());
    };

    let project_id = match cache.resolve_project(&entry.project).map(str::to_string) {
        Some(id) => id,
        None => {
            let project = api.create_project(&entry.project).await?;
            info!(project = %entry.project, id = %project.id, "Created project");
            cache.register_project(&project);
            outcome.projects_created += 1;
            project.id
        }
    };

    // Create missing folders along the path, parent before child.
    let mut parent: Option<String> = None;
    let mut display_so_far = String::new();
    for segment in entry
        .folder_path
        .split('/')
        .filter(|s| !s.trim().is_empty())
    {
        if display_so_far.is_empty() {
            display_so_far.push_str(segment);
        } else {
            display_so_far = format!("{display_so_far}/{segment}");
        }
        match cache
            .resolve_folder_path(&project_id, &display_so_far)
            .map(str::to_string)
        {
            Some(id) => parent = Some(id),
            None => {
                let folder = api
                    .create_folder(segment, &project_id, parent.as_deref())
                    .await?;
                debug!(folder = %display_so_far, id = %folder.id, "Created folder");
                cache.register_folder(&folder.id, &project_id, &display_so_far);
                outcome.folders_created += 1;
                parent = Some(folder.id);
            }
        }
    }
    let target_folder = parent;

    let (current_folder, current_project) = match cache.workflow_location(workflow_id) {
        Some(location) => (location.folder_id.clone(), location.project_id.clone()),
        None => (None, None),
    };
    let placed = match &target_folder {
        Some(folder) => current_folder.as_deref() == Some(folder.as_str()),
        None => {
            current_folder.is_none() && current_project.as_deref() == Some(project_id.as_str())
        }
    };
    if placed {
        debug!(workflow = %entry.name, "Workflow already sits in its target folder");
        return Ok(());
    }

    api.move_workflow(workflow_id, target_folder.as_deref(), &project_id)
        .await?;
    debug!(
        workflow = %entry.name,
        target = %entry.target_path(),
        "Reassigned workflow"
    );
    cache.register_workflow_location(workflow_id, target_folder.as_deref(), &project_id);
    outcome.workflows_reassigned += 1;
    Ok(())
}

#[cfg(test)]
#[path = "foldersync_tests.rs"]
mod tests;
