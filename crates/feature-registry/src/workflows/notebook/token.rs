use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error};

use super::service::TriggerError;

const TOKEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Service principal used for the client-credentials grant.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub authority: String,
    pub scope: String,
}

impl ClientCredentials {
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority.trim_end_matches('/'),
            self.tenant_id
        )
    }

    fn form(&self) -> [(&'static str, &str); 4] {
        [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "client_credentials"),
            ("scope", self.scope.as_str()),
        ]
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("authority", &self.authority)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Bearer token returned by the identity provider.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Source of bearer tokens for the orchestration API.
pub trait TokenSource: Send + Sync {
    fn access_token(
        &self,
        credentials: &ClientCredentials,
    ) -> impl Future<Output = Result<AccessToken, TriggerError>> + Send;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Client-credentials grant against the Microsoft identity platform.
/// A fresh token is requested for every call.
#[derive(Debug, Clone, Default)]
pub struct EntraTokenProvider {
    client: reqwest::Client,
}

impl EntraTokenProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl TokenSource for EntraTokenProvider {
    async fn access_token(
        &self,
        credentials: &ClientCredentials,
    ) -> Result<AccessToken, TriggerError> {
        let url = credentials.token_url();
        debug!(url = %url, client_id = %credentials.client_id, "requesting access token");

        let resp = self
            .client
            .post(&url)
            .form(&credentials.form())
            .timeout(TOKEN_TIMEOUT)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            error!(status = status.as_u16(), body = %body, "token request rejected");
            return Err(TriggerError::TokenRejected {
                status: status.as_u16(),
            });
        }

        parse_token_response(&body)
    }
}

fn parse_token_response(body: &str) -> Result<AccessToken, TriggerError> {
    let parsed: TokenResponse = serde_json::from_str(body).map_err(|err| {
        error!(error = %err, "token response is not JSON");
        TriggerError::MalformedToken("Failed to parse token response JSON.")
    })?;
    parsed
        .access_token
        .filter(|token| !token.is_empty())
        .map(AccessToken)
        .ok_or(TriggerError::MalformedToken(
            "access_token is missing in token response.",
        ))
}
