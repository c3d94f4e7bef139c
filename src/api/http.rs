use super::types::{Enveloped, Listing, RawFolder, RawProject, RawWorkflow};
use super::{ApiError, Folder, Project, RemoteApi, RemoteWorkflow};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

/// Header carrying the API key on every request.
const API_KEY_HEADER: &str = "X-N8N-API-KEY";

/// Production [`RemoteApi`] backed by the instance's REST surface.
pub struct HttpRemoteApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpRemoteApi {
    #[must_use]
    pub fn new(base_url: &str, api_key: &str) -> Self {
        HttpRemoteApi {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        debug!("GET {}", endpoint);
        let response = self
            .client
            .get(self.url(endpoint))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        Self::decode(endpoint, response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<T, ApiError> {
        debug!("POST {}", endpoint);
        let response = self
            .client
            .post(self.url(endpoint))
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;
        Self::decode(endpoint, response).await
    }

    async fn decode<T: DeserializeOwned>(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        let listing: Listing<RawProject> = self.get_json("projects").await?;
        Ok(listing.into_vec().into_iter().map(Project::from).collect())
    }

    async fn list_folders(&self) -> Result<Vec<Folder>, ApiError> {
        let listing: Listing<RawFolder> = self.get_json("folders").await?;
        Ok(listing.into_vec().into_iter().map(Folder::from).collect())
    }

    async fn list_workflows(&self) -> Result<Vec<RemoteWorkflow>, ApiError> {
        let listing: Listing<RawWorkflow> =
            self.get_json("workflows?includeFolders=true").await?;
        Ok(listing
            .into_vec()
            .into_iter()
            .map(RemoteWorkflow::from)
            .collect())
    }

    async fn create_project(&self, name: &str) -> Result<Project, ApiError> {
        let created: Enveloped<RawProject> = self
            .post_json("projects", &json!({ "name": name }))
            .await?;
        Ok(Project::from(created.into_inner()))
    }

    async fn create_folder(
        &self,
        name: &str,
        project_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Folder, ApiError> {
        let mut body = json!({ "name": name, "projectId": project_id });
        if let Some(parent) = parent_id {
            body["parentFolderId"] = json!(parent);
        }
        let created: Enveloped<RawFolder> = self.post_json("folders", &body).await?;
        Ok(Folder::from(created.into_inner()))
    }

    async fn move_workflow(
        &self,
        workflow_id: &str,
        folder_id: Option<&str>,
        project_id: &str,
    ) -> Result<(), ApiError> {
        let endpoint = format!("workflows/{workflow_id}");
        debug!("PATCH {}", endpoint);
        // A null parentFolderId moves the workflow to the project root.
        let response = self
            .client
            .patch(self.url(&endpoint))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({ "parentFolderId": folder_id, "projectId": project_id }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
