//! Remote State Cache: in-memory indexes over the remote's projects,
//! folders, and workflows.
//!
//! Loaded once per pipeline phase and queried everywhere. Folder paths are
//! resolved here by walking parent chains, with a hop bound so a corrupt
//! parent cycle degrades to a truncated path instead of a hang.

use crate::api::{ApiError, Folder, Project, ProjectKind, RemoteApi, RemoteWorkflow};
use crate::text::{comparison_key, normalize_folder_path, slugify};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Parent-chain hops allowed when resolving a folder path.
pub const MAX_PATH_DEPTH: usize = 50;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Remote returned no projects; cannot determine a default project")]
    NoProjects,

    #[error("Failed to fetch projects from remote: {0}")]
    ProjectsUnavailable(#[source] ApiError),
}

/// Location of a workflow as the remote reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowLocation {
    pub folder_id: Option<String>,
    pub project_id: Option<String>,
    pub version_id: Option<String>,
}

#[derive(Debug, Clone)]
struct FolderInfo {
    /// Display-cased path from project root, e.g. `"Clients/Acme"`.
    display_path: String,
    project_id: String,
}

/// In-memory view of the remote instance's structure.
#[derive(Debug)]
pub struct RemoteStateCache {
    default_project_id: String,
    /// Normalized project name (or slug) to project id.
    project_ids: HashMap<String, String>,
    /// Project id to display name.
    project_names: HashMap<String, String>,
    /// `(project id, normalized folder path)` to folder id.
    folder_ids: HashMap<(String, String), String>,
    /// Folder id to its resolved display path and project.
    folder_info: HashMap<String, FolderInfo>,
    /// Workflow id to its reported location.
    workflow_locations: HashMap<String, WorkflowLocation>,
}

impl RemoteStateCache {
    /// Build the cache from already-fetched collections.
    ///
    /// An empty project list is fatal: without a default project, folder
    /// placement is undefined. Empty folder or workflow lists are normal
    /// (a clean instance has neither).
    pub fn load(
        projects: Vec<Project>,
        folders: Vec<Folder>,
        workflows: Vec<RemoteWorkflow>,
    ) -> Result<Self, CacheError> {
        let default_project_id = projects
            .iter()
            .find(|p| p.kind == ProjectKind::Personal)
            .or_else(|| projects.first())
            .map(|p| p.id.clone())
            .ok_or(CacheError::NoProjects)?;

        let mut cache = RemoteStateCache {
            default_project_id,
            project_ids: HashMap::new(),
            project_names: HashMap::new(),
            folder_ids: HashMap::new(),
            folder_info: HashMap::new(),
            workflow_locations: HashMap::new(),
        };

        for project in &projects {
            cache.index_project(&project.id, &project.name);
        }
        // The default project always answers to "personal", whatever its
        // display name is.
        cache
            .project_ids
            .insert("personal".to_string(), cache.default_project_id.clone());

        cache.index_folders(folders);

        for wf in workflows {
            cache.workflow_locations.insert(
                wf.id,
                WorkflowLocation {
                    folder_id: wf.folder_id,
                    project_id: wf.project_id,
                    version_id: wf.version_id,
                },
            );
        }

        info!(
            "Cached remote state: {} projects, {} folders, {} workflows",
            cache.project_names.len(),
            cache.folder_info.len(),
            cache.workflow_locations.len()
        );

        Ok(cache)
    }

    /// Fetch all three collections and build the cache.
    ///
    /// A failed project fetch is fatal. Failed folder or workflow fetches
    /// degrade to empty collections with a warning, since a clean or older
    /// instance may not expose them.
    pub async fn load_from_api(api: &dyn RemoteApi) -> Result<Self, CacheError> {
        let projects = api
            .list_projects()
            .await
            .map_err(CacheError::ProjectsUnavailable)?;

        let folders = match api.list_folders().await {
            Ok(folders) => folders,
            Err(e) => {
                warn!("Could not list folders; treating as empty: {e}");
                Vec::new()
            }
        };

        let workflows = match api.list_workflows().await {
            Ok(workflows) => workflows,
            Err(e) => {
                warn!("Could not list workflows; treating as empty: {e}");
                Vec::new()
            }
        };

        Self::load(projects, folders, workflows)
    }

    fn index_project(&mut self, id: &str, name: &str) {
        self.project_ids
            .insert(comparison_key(name), id.to_string());
        let slug = slugify(name);
        if !slug.is_empty() {
            self.project_ids.insert(slug, id.to_string());
        }
        self.project_names.insert(id.to_string(), name.to_string());
    }

    fn index_folders(&mut self, folders: Vec<Folder>) {
        // Keyed walks below only read from this map.
        let mut raw: HashMap<String, Folder> = HashMap::new();
        let mut ordered_ids: Vec<String> = folders.iter().map(|f| f.id.clone()).collect();
        ordered_ids.sort();
        for folder in folders {
            raw.insert(folder.id.clone(), folder);
        }

        let mut inherited = 0usize;
        for id in &ordered_ids {
            let (segments, project_id, explicit) = self.walk_chain(id, &raw);
            if !explicit {
                inherited = inherited.saturating_add(1);
            }
            let display_path = segments.join("/");
            let normalized = normalize_folder_path(&display_path);
            self.folder_ids
                .insert((project_id.clone(), normalized), id.clone());
            self.folder_info.insert(
                id.clone(),
                FolderInfo {
                    display_path,
                    project_id,
                },
            );
        }

        if inherited > 0 {
            warn!(
                "{} folder(s) had no project reference; assigned from parent or default project",
                inherited
            );
        }
    }

    /// Walk the parent chain of `folder_id`, returning the display segments
    /// from root to leaf, the effective project id, and whether that project
    /// came from the folder's own record.
    fn walk_chain(
        &self,
        folder_id: &str,
        raw: &HashMap<String, Folder>,
    ) -> (Vec<String>, String, bool) {
        let mut segments_rev: Vec<String> = Vec::new();
        let mut project_id: Option<String> = None;
        let mut explicit = false;
        let mut current: Option<&str> = Some(folder_id);
        let mut hops = 0usize;

        while let Some(id) = current {
            let Some(folder) = raw.get(id) else {
                // Parent points at a folder the remote never returned;
                // treat the chain as ending here.
                break;
            };
            hops = hops.saturating_add(1);
            if hops > MAX_PATH_DEPTH {
                warn!(
                    "Folder {} parent chain exceeded {} hops (possible cycle); truncating path",
                    folder_id, MAX_PATH_DEPTH
                );
                break;
            }
            segments_rev.push(folder.name.clone());
            if project_id.is_none() {
                if let Some(p) = &folder.project_id {
                    project_id = Some(p.clone());
                    explicit = id == folder_id;
                }
            }
            current = folder.parent_id.as_deref();
        }

        segments_rev.reverse();
        let project_id = project_id.unwrap_or_else(|| {
            debug!("Folder {} has no project anywhere in its chain; using default", folder_id);
            self.default_project_id.clone()
        });
        (segments_rev, project_id, explicit)
    }

    // ---- Queries ----

    #[must_use]
    pub fn default_project_id(&self) -> &str {
        &self.default_project_id
    }

    /// Resolve a project by display name, slug, or the "personal" alias.
    #[must_use]
    pub fn resolve_project(&self, name: &str) -> Option<&str> {
        self.project_ids
            .get(&comparison_key(name))
            .or_else(|| self.project_ids.get(&slugify(name)))
            .map(String::as_str)
    }

    #[must_use]
    pub fn project_display_name(&self, project_id: &str) -> Option<&str> {
        self.project_names.get(project_id).map(String::as_str)
    }

    /// Resolve a folder by project and path. The path is normalized before
    /// lookup, so display-cased and slugged spellings both resolve.
    #[must_use]
    pub fn resolve_folder_path(&self, project_id: &str, path: &str) -> Option<&str> {
        let key = (project_id.to_string(), normalize_folder_path(path));
        self.folder_ids.get(&key).map(String::as_str)
    }

    #[must_use]
    pub fn folder_display_path(&self, folder_id: &str) -> Option<&str> {
        self.folder_info
            .get(folder_id)
            .map(|info| info.display_path.as_str())
    }

    #[must_use]
    pub fn folder_project(&self, folder_id: &str) -> Option<&str> {
        self.folder_info
            .get(folder_id)
            .map(|info| info.project_id.as_str())
    }

    #[must_use]
    pub fn workflow_location(&self, workflow_id: &str) -> Option<&WorkflowLocation> {
        self.workflow_locations.get(workflow_id)
    }

    #[must_use]
    pub fn workflow_count(&self) -> usize {
        self.workflow_locations.len()
    }

    /// Full location of a workflow as `<project>/<folder path>`, in display
    /// casing, when the remote reported enough to resolve one.
    #[must_use]
    pub fn workflow_relative_path(&self, workflow_id: &str) -> Option<String> {
        let location = self.workflow_locations.get(workflow_id)?;
        let (project_id, folder_path) = match &location.folder_id {
            Some(folder_id) => {
                let info = self.folder_info.get(folder_id)?;
                (info.project_id.clone(), Some(info.display_path.clone()))
            }
            None => (
                location
                    .project_id
                    .clone()
                    .unwrap_or_else(|| self.default_project_id.clone()),
                None,
            ),
        };
        let project_name = self.project_names.get(&project_id)?;
        Some(match folder_path {
            Some(path) => format!("{project_name}/{path}"),
            None => project_name.clone(),
        })
    }

    // ---- Extension during synchronization ----

    /// Record a project created mid-run so later entries resolve it.
    pub fn register_project(&mut self, project: &Project) {
        self.index_project(&project.id, &project.name);
    }

    /// Record a folder created mid-run under its resolved display path.
    pub fn register_folder(&mut self, folder_id: &str, project_id: &str, display_path: &str) {
        self.folder_ids.insert(
            (
                project_id.to_string(),
                normalize_folder_path(display_path),
            ),
            folder_id.to_string(),
        );
        self.folder_info.insert(
            folder_id.to_string(),
            FolderInfo {
                display_path: display_path.to_string(),
                project_id: project_id.to_string(),
            },
        );
    }

    /// Record a workflow placement applied mid-run, so a later entry for
    /// the same workflow sees its current position.
    pub fn register_workflow_location(
        &mut self,
        workflow_id: &str,
        folder_id: Option<&str>,
        project_id: &str,
    ) {
        let version_id = self
            .workflow_locations
            .get(workflow_id)
            .and_then(|l| l.version_id.clone());
        self.workflow_locations.insert(
            workflow_id.to_string(),
            WorkflowLocation {
                folder_id: folder_id.map(str::to_string),
                project_id: Some(project_id.to_string()),
                version_id,
            },
        );
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
