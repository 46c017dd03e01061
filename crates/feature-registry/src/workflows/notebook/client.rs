use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tracing::info;

use super::service::TriggerError;
use super::token::AccessToken;

const TRIGGER_TIMEOUT: Duration = Duration::from_secs(30);

/// Workspace item the run is started for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookTarget {
    api_base: String,
    workspace_id: String,
    artifact_id: String,
}

impl NotebookTarget {
    pub fn new(api_base: &str, workspace_id: String, artifact_id: String) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            workspace_id,
            artifact_id,
        }
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn trigger_url(&self) -> String {
        format!(
            "{}/v1/workspaces/{}/items/{}/jobs/instances?jobType=RunNotebook",
            self.api_base, self.workspace_id, self.artifact_id
        )
    }
}

/// Status and raw body of the orchestration API's reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

/// Submits a notebook run. Any HTTP reply is returned as-is; only transport
/// failures are errors.
pub trait NotebookLauncher: Send + Sync {
    fn launch(
        &self,
        target: &NotebookTarget,
        token: &AccessToken,
        payload: &Value,
    ) -> impl Future<Output = Result<UpstreamResponse, TriggerError>> + Send;
}

#[derive(Debug, Clone, Default)]
pub struct FabricNotebookClient {
    client: reqwest::Client,
}

impl FabricNotebookClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl NotebookLauncher for FabricNotebookClient {
    async fn launch(
        &self,
        target: &NotebookTarget,
        token: &AccessToken,
        payload: &Value,
    ) -> Result<UpstreamResponse, TriggerError> {
        let url = target.trigger_url();
        info!(url = %url, "submitting notebook run");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(token.secret())
            .json(payload)
            .timeout(TRIGGER_TIMEOUT)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(UpstreamResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_url_trims_trailing_slash() {
        let target = NotebookTarget::new(
            "https://api.fabric.microsoft.com//",
            "ws".to_string(),
            "nb".to_string(),
        );
        assert_eq!(
            target.trigger_url(),
            "https://api.fabric.microsoft.com/v1/workspaces/ws/items/nb/jobs/instances?jobType=RunNotebook"
        );
        assert_eq!((target.workspace_id(), target.artifact_id()), ("ws", "nb"));
    }
}
