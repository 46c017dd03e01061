use serde::Serialize;
use tracing::{info, warn};

use super::client::{FabricNotebookClient, NotebookLauncher, NotebookTarget};
use super::request::TriggerParameters;
use super::token::{ClientCredentials, EntraTokenProvider, TokenSource};
use crate::config::{ConfigError, NotebookConfig};

/// Upstream statuses that count as a started run.
pub const ACCEPTED_STATUSES: [u16; 3] = [200, 201, 202];

/// Body returned to the caller once the run has been accepted upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerReceipt {
    pub message: &'static str,
    pub upstream_status: u16,
    pub upstream_response: String,
}

/// Starts notebook runs with validated parameters.
///
/// Target and credentials are resolved from configuration once; a missing
/// setting surfaces on each request as [`TriggerError::Configuration`].
pub struct NotebookTriggerService<T, L> {
    target: Result<NotebookTarget, ConfigError>,
    credentials: Result<ClientCredentials, ConfigError>,
    tokens: T,
    launcher: L,
}

impl NotebookTriggerService<EntraTokenProvider, FabricNotebookClient> {
    /// Production wiring sharing one HTTP connection pool.
    pub fn over_http(config: &NotebookConfig) -> Self {
        let client = reqwest::Client::new();
        Self::from_config(
            config,
            EntraTokenProvider::new(client.clone()),
            FabricNotebookClient::new(client),
        )
    }
}

impl<T, L> NotebookTriggerService<T, L>
where
    T: TokenSource,
    L: NotebookLauncher,
{
    pub fn new(
        target: Result<NotebookTarget, ConfigError>,
        credentials: Result<ClientCredentials, ConfigError>,
        tokens: T,
        launcher: L,
    ) -> Self {
        Self {
            target,
            credentials,
            tokens,
            launcher,
        }
    }

    pub fn from_config(config: &NotebookConfig, tokens: T, launcher: L) -> Self {
        Self::new(config.target(), config.credentials(), tokens, launcher)
    }

    pub fn tokens(&self) -> &T {
        &self.tokens
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub async fn trigger(
        &self,
        parameters: TriggerParameters,
    ) -> Result<TriggerReceipt, TriggerError> {
        let target = self.target.as_ref().map_err(Clone::clone)?;
        let credentials = self.credentials.as_ref().map_err(Clone::clone)?;

        info!(
            sample_size = parameters.sample_size,
            max_candidates = parameters.max_candidates,
            min_candidates = parameters.min_candidates,
            workspace_id = target.workspace_id(),
            "triggering candidate notebook"
        );

        let token = self.tokens.access_token(credentials).await?;
        let payload = parameters.into_payload();
        let response = self.launcher.launch(target, &token, &payload).await?;

        if !ACCEPTED_STATUSES.contains(&response.status) {
            warn!(status = response.status, "notebook trigger rejected upstream");
            return Err(TriggerError::Rejected {
                status: response.status,
                body: response.body,
            });
        }

        info!(status = response.status, "notebook triggered");
        Ok(TriggerReceipt {
            message: "Notebook triggered.",
            upstream_status: response.status,
            upstream_response: response.body,
        })
    }
}

/// Failures of the trigger workflow.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("sample_size, max_candidates, min_candidates must be numbers.")]
    InvalidParameters,
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error("Failed to obtain access token. status={status}")]
    TokenRejected { status: u16 },
    #[error("{0}")]
    MalformedToken(&'static str),
    #[error("notebook request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Failed to trigger notebook.")]
    Rejected { status: u16, body: String },
}
