#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use feature_registry::api::{api_router, ApiState};
use feature_registry::config::ConfigError;
use feature_registry::store::{bootstrap, Database, PragmaCatalog};
use feature_registry::workflows::notebook::{
    AccessToken, ClientCredentials, NotebookLauncher, NotebookTarget, NotebookTriggerService,
    TokenSource, TriggerError, UpstreamResponse,
};
use rusqlite::Connection;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

#[derive(Clone, Default)]
pub struct FakeTokens {
    pub calls: Arc<Mutex<usize>>,
}

impl TokenSource for FakeTokens {
    async fn access_token(
        &self,
        _credentials: &ClientCredentials,
    ) -> Result<AccessToken, TriggerError> {
        *self.calls.lock().expect("token mutex poisoned") += 1;
        Ok(AccessToken::new("test-token"))
    }
}

#[derive(Clone)]
pub struct FakeLauncher {
    pub payloads: Arc<Mutex<Vec<Value>>>,
    pub reply: UpstreamResponse,
}

impl FakeLauncher {
    pub fn replying(status: u16, body: &str) -> Self {
        Self {
            payloads: Arc::default(),
            reply: UpstreamResponse {
                status,
                body: body.to_string(),
            },
        }
    }
}

impl NotebookLauncher for FakeLauncher {
    async fn launch(
        &self,
        _target: &NotebookTarget,
        _token: &AccessToken,
        payload: &Value,
    ) -> Result<UpstreamResponse, TriggerError> {
        self.payloads
            .lock()
            .expect("launcher mutex poisoned")
            .push(payload.clone());
        Ok(self.reply.clone())
    }
}

/// Router over a bootstrapped SQLite file with recording notebook fakes.
pub struct TestApp {
    pub dir: TempDir,
    pub database: Database,
    pub tokens: FakeTokens,
    pub launcher: FakeLauncher,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_launcher(FakeLauncher::replying(202, r#"{"id":"job-1"}"#))
    }

    pub fn with_launcher(launcher: FakeLauncher) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let database = Database::new(dir.path().join("features.db").to_string_lossy());
        let conn = database.connect().expect("connection");
        bootstrap::apply(&conn).expect("schema");

        let tokens = FakeTokens::default();
        let notebook = NotebookTriggerService::new(
            Ok(NotebookTarget::new(
                "https://fabric.test",
                "ws".to_string(),
                "nb".to_string(),
            )),
            Ok(ClientCredentials {
                tenant_id: "tenant".to_string(),
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
                authority: "https://login.test".to_string(),
                scope: "scope/.default".to_string(),
            }),
            tokens.clone(),
            launcher.clone(),
        );
        let state = ApiState::new(Ok(database.clone()), Arc::new(PragmaCatalog), notebook);

        Self {
            dir,
            database,
            tokens,
            launcher,
            router: api_router(Arc::new(state)),
        }
    }

    /// Router whose database setting is absent.
    pub fn unconfigured() -> Router {
        let notebook = NotebookTriggerService::new(
            Err(ConfigError::Missing("FABRIC_WORKSPACE_ID")),
            Err(ConfigError::Missing("FABRIC_TENANT_ID")),
            FakeTokens::default(),
            FakeLauncher::replying(202, ""),
        );
        let state = ApiState::new(
            Err(ConfigError::Missing("FEATURE_DB_PATH")),
            Arc::new(PragmaCatalog),
            notebook,
        );
        api_router(Arc::new(state))
    }

    pub fn conn(&self) -> Connection {
        self.database.connect().expect("connection")
    }

    pub fn seed(&self, sql: &str) {
        self.conn().execute_batch(sql).expect("seed data");
    }

    pub fn count(&self, table: &str) -> i64 {
        self.conn()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .expect("count rows")
    }

    pub fn token_calls(&self) -> usize {
        *self.tokens.calls.lock().expect("token mutex poisoned")
    }

    pub fn launched_payloads(&self) -> Vec<Value> {
        self.launcher
            .payloads
            .lock()
            .expect("launcher mutex poisoned")
            .clone()
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        send(&self.router, Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        post_to(&self.router, uri, body).await
    }
}

pub async fn post_to(router: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, read_json_body(response).await)
}

pub async fn read_json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
