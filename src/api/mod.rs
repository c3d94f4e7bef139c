//! Seam to the remote workflow API.
//!
//! Everything the engine needs from the remote is behind [`RemoteApi`] so
//! the pipeline can run against an in-memory fake in tests. The production
//! implementation lives in [`http`].

mod http;
mod types;

pub use http::HttpRemoteApi;
pub use types::{Folder, Project, ProjectKind, RemoteWorkflow};
pub(crate) use types::Listing;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned {status} for {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode API response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Operations the engine performs against the remote instance.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError>;

    async fn list_folders(&self) -> Result<Vec<Folder>, ApiError>;

    /// Workflows with their folder/project placement included.
    async fn list_workflows(&self) -> Result<Vec<RemoteWorkflow>, ApiError>;

    async fn create_project(&self, name: &str) -> Result<Project, ApiError>;

    async fn create_folder(
        &self,
        name: &str,
        project_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Folder, ApiError>;

    /// Reassign a workflow to a folder, or to the project root when
    /// `folder_id` is `None`.
    async fn move_workflow(
        &self,
        workflow_id: &str,
        folder_id: Option<&str>,
        project_id: &str,
    ) -> Result<(), ApiError>;
}
