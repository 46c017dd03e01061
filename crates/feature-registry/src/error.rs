use crate::config::ConfigError;
use crate::store::StoreError;
use crate::telemetry::TelemetryError;
use crate::workflows::candidates::CandidateError;
use crate::workflows::notebook::TriggerError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::fmt;
use tokio::task::JoinError;
use tracing::error;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Store(StoreError),
    Candidate(CandidateError),
    Trigger(TriggerError),
    Task(JoinError),
    InvalidBody(&'static str),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            AppError::Candidate(err) => match err {
                CandidateError::InvalidRequest => StatusCode::BAD_REQUEST,
                CandidateError::NotFound(_) => StatusCode::NOT_FOUND,
                CandidateError::Conflict { .. } => StatusCode::CONFLICT,
                CandidateError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Trigger(err) => match err {
                TriggerError::InvalidParameters => StatusCode::BAD_REQUEST,
                TriggerError::Rejected { .. } => StatusCode::BAD_GATEWAY,
                TriggerError::Configuration(_)
                | TriggerError::TokenRejected { .. }
                | TriggerError::MalformedToken(_)
                | TriggerError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Store(_)
            | AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text returned to HTTP callers, without the category prefix of `Display`.
    pub fn message(&self) -> String {
        match self {
            AppError::Config(err) => err.to_string(),
            AppError::Telemetry(err) => err.to_string(),
            AppError::Io(err) => err.to_string(),
            AppError::Store(err) => err.to_string(),
            AppError::Candidate(err) => err.to_string(),
            AppError::Trigger(err) => err.to_string(),
            AppError::Task(err) => err.to_string(),
            AppError::InvalidBody(message) => (*message).to_string(),
        }
    }

    fn body(&self) -> Value {
        let mut body = json!({ "message": self.message() });
        if let AppError::Trigger(TriggerError::Rejected { status, body: upstream }) = self {
            body["status_code"] = json!(status);
            body["response"] = json!(upstream);
        }
        body
    }

    /// Attach the name of the endpoint that failed.
    pub fn at(self, endpoint: &'static str) -> EndpointError {
        EndpointError {
            endpoint,
            error: self,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Store(err) => write!(f, "data access error: {}", err),
            AppError::Candidate(err) => write!(f, "candidate error: {}", err),
            AppError::Trigger(err) => write!(f, "notebook trigger error: {}", err),
            AppError::Task(err) => write!(f, "background task error: {}", err),
            AppError::InvalidBody(message) => write!(f, "invalid request body: {}", message),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Candidate(err) => Some(err),
            AppError::Trigger(err) => Some(err),
            AppError::Task(err) => Some(err),
            AppError::InvalidBody(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// An [`AppError`] tagged with the endpoint it came from.
#[derive(Debug)]
pub struct EndpointError {
    pub endpoint: &'static str,
    pub error: AppError,
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        let status = self.error.status();
        error!(
            endpoint = self.endpoint,
            status = status.as_u16(),
            error = %self.error,
            "request failed"
        );
        let mut body = self.error.body();
        body["endpoint"] = json!(self.endpoint);
        (status, Json(body)).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<CandidateError> for AppError {
    fn from(value: CandidateError) -> Self {
        Self::Candidate(value)
    }
}

impl From<TriggerError> for AppError {
    fn from(value: TriggerError) -> Self {
        Self::Trigger(value)
    }
}

impl From<JoinError> for AppError {
    fn from(value: JoinError) -> Self {
        Self::Task(value)
    }
}
