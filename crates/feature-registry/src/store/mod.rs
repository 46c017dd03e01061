//! SQLite access for the feature store. Connections are opened per request;
//! see [`bootstrap`] for the local development schema.

pub mod bootstrap;
pub mod rows;
pub mod schema;

use std::time::Duration;

use rusqlite::Connection;

pub use rows::{format_timestamp, Row, RowSet};
pub use schema::{quote_identifier, CachedCatalog, PragmaCatalog, TableCatalog};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the configured database. Connections are opened per request and
/// closed when dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Database {
    path: String,
}

impl Database {
    /// `path` may be a filesystem path or a `file:` URI.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }
}

/// Error enumeration for database failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid SQL identifier '{0}'")]
    InvalidIdentifier(String),
}
