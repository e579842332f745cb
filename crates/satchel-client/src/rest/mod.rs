//! REST surface of the satchel backend, as consumed by the client.
//!
//! [`StudioApi`] abstracts the four task endpoints (create, list, detail,
//! delete) so the tracker can be driven by the real HTTP implementation in
//! production and by scripted fakes in tests.

pub mod schemas;

use std::future::Future;

use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use satchel_types::{ArtifactKind, FileId, GenerationParams, TaskId, WorkspaceId};

use crate::config::ClientConfig;
use crate::error::ApiError;
use schemas::{CreateTaskResponse, TaskDetail, TaskSummary};

/// The task endpoints of the satchel backend.
///
/// Implementations must be cheap to share behind an `Arc`; the tracker
/// clones the handle into its poll loop and refresh tasks.
pub trait StudioApi: Send + Sync + 'static {
    /// `POST` a generation request to the kind-specific endpoint.
    fn create_task(
        &self,
        workspace: &WorkspaceId,
        params: &GenerationParams,
        files: &[FileId],
    ) -> impl Future<Output = Result<CreateTaskResponse, ApiError>> + Send;

    /// `GET` the ordered list of task summaries for a workspace.
    fn list_tasks(
        &self,
        workspace: &WorkspaceId,
    ) -> impl Future<Output = Result<Vec<TaskSummary>, ApiError>> + Send;

    /// `GET` a single task's full summary.
    fn get_task(
        &self,
        workspace: &WorkspaceId,
        id: &TaskId,
    ) -> impl Future<Output = Result<TaskSummary, ApiError>> + Send;

    /// `GET` the kind-specific result payload of a finished task.
    fn task_detail(
        &self,
        workspace: &WorkspaceId,
        id: &TaskId,
        kind: ArtifactKind,
    ) -> impl Future<Output = Result<TaskDetail, ApiError>> + Send;

    /// `DELETE` a task.
    fn delete_task(
        &self,
        workspace: &WorkspaceId,
        id: &TaskId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// [`StudioApi`] over HTTP via `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpStudioApi {
    base: String,
    client: reqwest::Client,
}

impl HttpStudioApi {
    /// Build the HTTP client from the tracker configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("satchel-client/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            base: config.base_url.trim_end_matches('/').to_owned(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        // Every request carries a fresh id so server and client logs line up.
        self.client
            .request(method, url)
            .header("x-request-id", Uuid::new_v4().to_string())
    }
}

impl StudioApi for HttpStudioApi {
    async fn create_task(
        &self,
        workspace: &WorkspaceId,
        params: &GenerationParams,
        files: &[FileId],
    ) -> Result<CreateTaskResponse, ApiError> {
        let url = self.url(&format!(
            "workspaces/{workspace}/generate/{}",
            params.kind().endpoint_segment()
        ));
        debug!(%url, kind = %params.kind(), files = files.len(), "creating task");
        let query: Vec<(&str, &str)> = files.iter().map(|f| ("fileIds", f.as_str())).collect();
        let resp = self
            .request(reqwest::Method::POST, url)
            .query(&query)
            .json(params)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn list_tasks(&self, workspace: &WorkspaceId) -> Result<Vec<TaskSummary>, ApiError> {
        let url = self.url(&format!("workspaces/{workspace}/tasks"));
        let resp = self.request(reqwest::Method::GET, url).send().await?;
        read_json(resp).await
    }

    async fn get_task(&self, workspace: &WorkspaceId, id: &TaskId) -> Result<TaskSummary, ApiError> {
        let url = self.url(&format!("workspaces/{workspace}/tasks/{id}"));
        let resp = self.request(reqwest::Method::GET, url).send().await?;
        read_json(resp).await
    }

    async fn task_detail(
        &self,
        workspace: &WorkspaceId,
        id: &TaskId,
        kind: ArtifactKind,
    ) -> Result<TaskDetail, ApiError> {
        let url = self.url(&format!("workspaces/{workspace}/tasks/{id}/detail"));
        let resp = self
            .request(reqwest::Method::GET, url)
            .query(&[("type", kind.endpoint_segment())])
            .send()
            .await?;
        read_json(resp).await
    }

    async fn delete_task(&self, workspace: &WorkspaceId, id: &TaskId) -> Result<(), ApiError> {
        let url = self.url(&format!("workspaces/{workspace}/tasks/{id}"));
        let resp = self.request(reqwest::Method::DELETE, url).send().await?;
        read_empty(resp).await
    }
}

// ── response helpers ─────────────────────────────────────────────────────────

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }
    let body = resp.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

async fn read_empty(resp: reqwest::Response) -> Result<(), ApiError> {
    let status = resp.status();
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(())
}
