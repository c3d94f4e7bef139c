//! Common test utilities: an in-memory workflow instance that serves both
//! the REST surface and the engine CLI surface, so pipeline tests run
//! against one consistent state.

// Not every test file uses every helper.
#![allow(dead_code)]

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use flowvault::api::{ApiError, Folder, Project, ProjectKind, RemoteApi, RemoteWorkflow};
use flowvault::engine::{EngineCommands, EngineError};
use flowvault::ident::is_valid_workflow_id;

/// Project id of the personal project every fake instance starts with.
pub const PERSONAL_PROJECT: &str = "p-personal";

#[derive(Default)]
pub struct InstanceState {
    next_id: u32,
    pub projects: Vec<Project>,
    pub folders: Vec<Folder>,
    pub workflows: Vec<RemoteWorkflow>,
    pub credential_imports: usize,
}

/// Fake of a live instance. The REST listing, folder creation, workflow
/// moves, and the engine's export/import commands all read and mutate the
/// same state, mirroring how the real server backs both surfaces.
///
/// Import follows the real command's contract: a staged file with a valid
/// id updates the workflow of that id, or is created under that id when it
/// does not exist yet; a file without one gets a freshly assigned id. New
/// workflows always land at the personal project root.
pub struct FakeInstance {
    state: Mutex<InstanceState>,
}

impl Default for FakeInstance {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeInstance {
    pub fn new() -> Self {
        let mut state = InstanceState::default();
        state.projects.push(Project {
            id: PERSONAL_PROJECT.to_string(),
            name: "Personal".to_string(),
            kind: ProjectKind::Personal,
        });
        FakeInstance {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, InstanceState> {
        self.state.lock().expect("Instance state lock poisoned")
    }

    pub fn add_project(&self, id: &str, name: &str) {
        self.state().projects.push(Project {
            id: id.to_string(),
            name: name.to_string(),
            kind: ProjectKind::Team,
        });
    }

    pub fn add_folder(&self, id: &str, name: &str, parent: Option<&str>, project: &str) {
        self.state().folders.push(Folder {
            id: id.to_string(),
            name: name.to_string(),
            parent_id: parent.map(str::to_string),
            project_id: Some(project.to_string()),
        });
    }

    pub fn add_workflow(&self, id: &str, name: &str, folder: Option<&str>, project: &str) {
        self.state().workflows.push(RemoteWorkflow {
            id: id.to_string(),
            name: name.to_string(),
            folder_id: folder.map(str::to_string),
            project_id: Some(project.to_string()),
            version_id: None,
            instance_marker: None,
        });
    }

    pub fn add_workflow_with_marker(&self, id: &str, name: &str, marker: &str) {
        self.state().workflows.push(RemoteWorkflow {
            id: id.to_string(),
            name: name.to_string(),
            folder_id: None,
            project_id: Some(PERSONAL_PROJECT.to_string()),
            version_id: None,
            instance_marker: Some(marker.to_string()),
        });
    }

    pub fn workflow_count(&self) -> usize {
        self.state().workflows.len()
    }

    pub fn credential_imports(&self) -> usize {
        self.state().credential_imports
    }

    pub fn workflow(&self, id: &str) -> Option<RemoteWorkflow> {
        self.state().workflows.iter().find(|w| w.id == id).cloned()
    }

    /// First workflow with the given exact name.
    pub fn workflow_named(&self, name: &str) -> Option<RemoteWorkflow> {
        self.state()
            .workflows
            .iter()
            .find(|w| w.name == name)
            .cloned()
    }

    pub fn folder_named(&self, name: &str) -> Option<Folder> {
        self.state().folders.iter().find(|f| f.name == name).cloned()
    }

    pub fn folder(&self, id: &str) -> Option<Folder> {
        self.state().folders.iter().find(|f| f.id == id).cloned()
    }

    /// Folder names from the project root down to the given folder.
    pub fn folder_ancestry(&self, folder_id: &str) -> Vec<String> {
        let state = self.state();
        let mut names = Vec::new();
        let mut current = Some(folder_id.to_string());
        while let Some(id) = current {
            let Some(folder) = state.folders.iter().find(|f| f.id == id) else {
                break;
            };
            names.push(folder.name.clone());
            current = folder.parent_id.clone();
        }
        names.reverse();
        names
    }
}

#[async_trait]
impl RemoteApi for FakeInstance {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        Ok(self.state().projects.clone())
    }

    async fn list_folders(&self) -> Result<Vec<Folder>, ApiError> {
        Ok(self.state().folders.clone())
    }

    async fn list_workflows(&self) -> Result<Vec<RemoteWorkflow>, ApiError> {
        Ok(self.state().workflows.clone())
    }

    async fn create_project(&self, name: &str) -> Result<Project, ApiError> {
        let mut state = self.state();
        state.next_id += 1;
        let project = Project {
            id: format!("proj-{}", state.next_id),
            name: name.to_string(),
            kind: ProjectKind::Team,
        };
        state.projects.push(project.clone());
        Ok(project)
    }

    async fn create_folder(
        &self,
        name: &str,
        project_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Folder, ApiError> {
        let mut state = self.state();
        state.next_id += 1;
        let folder = Folder {
            id: format!("fold-{}", state.next_id),
            name: name.to_string(),
            parent_id: parent_id.map(str::to_string),
            project_id: Some(project_id.to_string()),
        };
        state.folders.push(folder.clone());
        Ok(folder)
    }

    async fn move_workflow(
        &self,
        workflow_id: &str,
        folder_id: Option<&str>,
        project_id: &str,
    ) -> Result<(), ApiError> {
        let mut state = self.state();
        let Some(workflow) = state.workflows.iter_mut().find(|w| w.id == workflow_id) else {
            return Err(ApiError::Status {
                endpoint: "workflows".to_string(),
                status: 404,
                body: format!("no workflow {workflow_id}"),
            });
        };
        workflow.folder_id = folder_id.map(str::to_string);
        workflow.project_id = Some(project_id.to_string());
        Ok(())
    }
}

fn workflow_value(wf: &RemoteWorkflow) -> Value {
    let mut doc = json!({
        "id": wf.id,
        "name": wf.name,
        "nodes": [],
        "connections": {},
    });
    if let Some(marker) = &wf.instance_marker {
        doc["meta"] = json!({ "instanceId": marker });
    }
    doc
}

#[async_trait]
impl EngineCommands for FakeInstance {
    async fn export_workflows(&self, dest_file: &Path) -> Result<(), EngineError> {
        let docs: Vec<Value> = self.state().workflows.iter().map(workflow_value).collect();
        let body = serde_json::to_string(&docs).expect("Should serialize export");
        std::fs::write(dest_file, body).expect("Should write export file");
        Ok(())
    }

    async fn export_workflows_separate(&self, dest_dir: &Path) -> Result<(), EngineError> {
        for wf in &self.state().workflows {
            let body =
                serde_json::to_string_pretty(&workflow_value(wf)).expect("Should serialize export");
            std::fs::write(dest_dir.join(format!("{}.json", wf.id)), body)
                .expect("Should write export file");
        }
        Ok(())
    }

    async fn import_workflows(&self, source: &Path) -> Result<(), EngineError> {
        let mut paths: Vec<_> = std::fs::read_dir(source)
            .expect("Should read staged directory")
            .map(|entry| entry.expect("Should read staged entry").path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut state = self.state();
        let default_project = state
            .projects
            .iter()
            .find(|p| p.kind == ProjectKind::Personal)
            .or_else(|| state.projects.first())
            .map(|p| p.id.clone())
            .expect("Fake instance should have a project");

        for path in paths {
            let content = std::fs::read_to_string(&path).expect("Should read staged file");
            let doc: Value =
                serde_json::from_str(&content).expect("Staged file should be valid JSON");
            let name = doc
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let marker = doc
                .pointer("/meta/instanceId")
                .and_then(Value::as_str)
                .map(str::to_string);
            let declared = doc.get("id").and_then(Value::as_str).map(str::to_string);

            match declared {
                Some(id) if is_valid_workflow_id(&id) => {
                    if let Some(existing) = state.workflows.iter_mut().find(|w| w.id == id) {
                        existing.name = name;
                        if marker.is_some() {
                            existing.instance_marker = marker;
                        }
                    } else {
                        state.workflows.push(RemoteWorkflow {
                            id,
                            name,
                            folder_id: None,
                            project_id: Some(default_project.clone()),
                            version_id: None,
                            instance_marker: marker,
                        });
                    }
                }
                _ => {
                    state.next_id += 1;
                    let id = format!("NEW{:013}", state.next_id);
                    state.workflows.push(RemoteWorkflow {
                        id,
                        name,
                        folder_id: None,
                        project_id: Some(default_project.clone()),
                        version_id: None,
                        instance_marker: marker,
                    });
                }
            }
        }
        Ok(())
    }

    async fn export_credentials(&self, dest_file: &Path) -> Result<(), EngineError> {
        std::fs::write(dest_file, "[]").expect("Should write credentials file");
        Ok(())
    }

    async fn import_credentials(&self, source: &Path) -> Result<(), EngineError> {
        assert!(source.is_file(), "Credential import expects an existing file");
        self.state().credential_imports += 1;
        Ok(())
    }
}

/// Create a temporary directory for testing
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Write one backup file, creating intermediate directories.
pub fn write_backup_file(root: &Path, relative: &str, body: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Should create backup directories");
    }
    std::fs::write(path, body).expect("Should write backup file");
}

/// Minimal workflow file body.
pub fn wf_body(id: Option<&str>, name: &str) -> String {
    let mut doc = json!({
        "name": name,
        "nodes": [],
        "connections": {},
    });
    if let Some(id) = id {
        doc["id"] = Value::String(id.to_string());
    }
    doc.to_string()
}

/// Workflow file body carrying a source-instance marker.
pub fn wf_body_with_marker(id: Option<&str>, name: &str, marker: &str) -> String {
    let mut doc: Value = serde_json::from_str(&wf_body(id, name)).expect("Should build body");
    doc["meta"] = json!({ "instanceId": marker });
    doc.to_string()
}
