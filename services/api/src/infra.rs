use feature_registry::api::ApiState;
use feature_registry::config::AppConfig;
use feature_registry::error::AppError;
use feature_registry::store::{bootstrap, Database};
use feature_registry::telemetry;
use feature_registry::workflows::notebook::{
    EntraTokenProvider, FabricNotebookClient, NotebookTriggerService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) type LiveApiState = ApiState<EntraTokenProvider, FabricNotebookClient>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Feature endpoint state wired to the real identity and orchestration APIs.
pub(crate) fn live_api_state(config: &AppConfig) -> Arc<LiveApiState> {
    for key in config.missing_settings() {
        warn!(setting = key, "setting missing; dependent endpoints will fail");
    }

    let notebook = NotebookTriggerService::over_http(&config.notebook);
    Arc::new(ApiState::from_config(config, notebook))
}

/// `db init`: apply the bootstrap schema to the configured database.
pub(crate) async fn init_database() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let database = config.database.require()?;
    let path = database.path().to_string();
    tokio::task::spawn_blocking(move || apply_schema(&database)).await??;

    info!(path = %path, "feature store initialized");
    Ok(())
}

fn apply_schema(database: &Database) -> Result<(), AppError> {
    let conn = database.connect()?;
    bootstrap::apply(&conn)?;
    Ok(())
}
