//! Backend contracts: fetch-project, patch-project, export-new-version.

use std::time::Duration;

use reelkit_common::config::BackendConfig;
use reelkit_common::error::{ReelError, ReelResult};
use reelkit_project_model::{BackendProject, ExportResponse, ProjectPatch};

/// The project/render backend as seen by the editor.
#[async_trait::async_trait]
pub trait ProjectBackend: Send + Sync {
    /// `GET {base}/projects/{id}`.
    async fn fetch_project(&self, media_id: &str) -> ReelResult<BackendProject>;

    /// `PATCH {base}/projects/{id}` with a full snapshot.
    async fn patch_project(&self, media_id: &str, patch: &ProjectPatch) -> ReelResult<()>;

    /// `POST {base}/projects/{id}/export`; returns the new version's media id.
    async fn export_new_version(&self, media_id: &str) -> ReelResult<ExportResponse>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}

/// JSON-over-HTTP implementation of [`ProjectBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: reqwest::Url,
    api_token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> ReelResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| ReelError::backend(format!("Failed to build HTTP client: {e}")))?;

        let base_url = reqwest::Url::parse(config.base_url.trim()).map_err(|e| {
            ReelError::config(format!("Invalid backend URL {}: {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ReelError::config(format!(
                "Backend URL {} cannot hold a path",
                config.base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            api_token: config.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// `{base}/projects/{id}` followed by `extra` segments. The id is
    /// percent-encoded as a single path segment.
    fn project_url(&self, media_id: &str, extra: &[&str]) -> ReelResult<reqwest::Url> {
        let mut url = self.base_url.clone();
        {
            let Ok(mut segments) = url.path_segments_mut() else {
                return Err(ReelError::config(format!(
                    "Backend URL {} cannot hold a path",
                    self.base_url
                )));
            };
            segments
                .pop_if_empty()
                .push("projects")
                .push(media_id)
                .extend(extra);
        }
        Ok(url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        media_id: &str,
        action: &str,
    ) -> ReelResult<reqwest::Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| ReelError::backend(format!("{action} request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ReelError::not_found(format!("project {media_id}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReelError::backend(format!(
                "{action} returned HTTP {status}: {}",
                body.trim()
            )));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl ProjectBackend for HttpBackend {
    async fn fetch_project(&self, media_id: &str) -> ReelResult<BackendProject> {
        tracing::debug!(media_id, "Fetching project");
        let request = self.client.get(self.project_url(media_id, &[])?);
        let response = self.send(request, media_id, "fetch-project").await?;
        let body = response
            .text()
            .await
            .map_err(|e| ReelError::backend(format!("fetch-project body unreadable: {e}")))?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn patch_project(&self, media_id: &str, patch: &ProjectPatch) -> ReelResult<()> {
        let body = patch
            .to_json()
            .map_err(|e| ReelError::backend(e.to_string()))?;
        tracing::debug!(media_id, bytes = body.len(), "Patching project");

        let request = self
            .client
            .patch(self.project_url(media_id, &[])?)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        self.send(request, media_id, "patch-project").await?;
        Ok(())
    }

    async fn export_new_version(&self, media_id: &str) -> ReelResult<ExportResponse> {
        tracing::debug!(media_id, "Requesting export");
        let request = self.client.post(self.project_url(media_id, &["export"])?);
        let response = self.send(request, media_id, "export-new-version").await?;
        let body = response
            .text()
            .await
            .map_err(|e| ReelError::backend(format!("export body unreadable: {e}")))?;
        Ok(serde_json::from_str(&body)?)
    }

    fn name(&self) -> &str {
        "http"
    }
}
