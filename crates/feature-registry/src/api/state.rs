use std::sync::Arc;

use crate::config::{AppConfig, ConfigError};
use crate::error::AppError;
use crate::store::{CachedCatalog, Database, PragmaCatalog, TableCatalog};
use crate::workflows::notebook::{NotebookLauncher, NotebookTriggerService, TokenSource};

/// Shared state of the feature endpoints.
pub struct ApiState<T, L> {
    pub database: Result<Database, ConfigError>,
    pub catalog: Arc<dyn TableCatalog>,
    pub notebook: NotebookTriggerService<T, L>,
}

impl<T, L> ApiState<T, L>
where
    T: TokenSource,
    L: NotebookLauncher,
{
    pub fn new(
        database: Result<Database, ConfigError>,
        catalog: Arc<dyn TableCatalog>,
        notebook: NotebookTriggerService<T, L>,
    ) -> Self {
        Self {
            database,
            catalog,
            notebook,
        }
    }

    /// Database handle and schema catalog from `config`; the notebook
    /// service is wired by the caller.
    pub fn from_config(config: &AppConfig, notebook: NotebookTriggerService<T, L>) -> Self {
        let catalog: Arc<dyn TableCatalog> = if config.database.cache_schema {
            Arc::new(CachedCatalog::new(PragmaCatalog))
        } else {
            Arc::new(PragmaCatalog)
        };
        Self::new(config.database.require(), catalog, notebook)
    }

    /// Run database work on the blocking pool with a handle to the store.
    pub(crate) async fn blocking<R, F>(&self, work: F) -> Result<R, AppError>
    where
        F: FnOnce(&Database, &dyn TableCatalog) -> Result<R, AppError> + Send + 'static,
        R: Send + 'static,
    {
        let database = self.database.clone()?;
        let catalog = Arc::clone(&self.catalog);
        tokio::task::spawn_blocking(move || work(&database, catalog.as_ref())).await?
    }
}
