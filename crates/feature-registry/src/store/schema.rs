use std::collections::HashMap;
use std::sync::RwLock;

use rusqlite::Connection;

use super::StoreError;

/// Column discovery for the generic row queries, so filters can be checked
/// against the live schema instead of a compiled-in list.
pub trait TableCatalog: Send + Sync {
    fn columns(&self, conn: &Connection, table: &str) -> Result<Vec<String>, StoreError>;
}

/// Reads column names from `pragma_table_info` on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct PragmaCatalog;

impl TableCatalog for PragmaCatalog {
    fn columns(&self, conn: &Connection, table: &str) -> Result<Vec<String>, StoreError> {
        quote_identifier(table)?;
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let names = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

/// Keeps the first non-empty column list seen per table for the lifetime of
/// the process. Schema changes are not picked up until restart.
#[derive(Debug, Default)]
pub struct CachedCatalog<C> {
    inner: C,
    cache: RwLock<HashMap<String, Vec<String>>>,
}

impl<C: TableCatalog> CachedCatalog<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }
}

impl<C: TableCatalog> TableCatalog for CachedCatalog<C> {
    fn columns(&self, conn: &Connection, table: &str) -> Result<Vec<String>, StoreError> {
        if let Ok(guard) = self.cache.read() {
            if let Some(columns) = guard.get(table) {
                return Ok(columns.clone());
            }
        }

        let columns = self.inner.columns(conn, table)?;
        // An empty list means the table does not exist (yet); keep asking.
        if !columns.is_empty() {
            if let Ok(mut guard) = self.cache.write() {
                guard.insert(table.to_string(), columns.clone());
            }
        }
        Ok(columns)
    }
}

/// Quote a table or column name for interpolation into SQL. Only ASCII
/// alphanumerics and underscores are accepted.
pub fn quote_identifier(name: &str) -> Result<String, StoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if valid {
        Ok(format!("\"{name}\""))
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch("CREATE TABLE probes (id TEXT, created_at TEXT, score REAL);")
            .expect("schema");
        conn
    }

    #[test]
    fn pragma_catalog_lists_columns_in_declaration_order() {
        let conn = connection();
        let columns = PragmaCatalog.columns(&conn, "probes").expect("columns");
        assert_eq!(columns, vec!["id", "created_at", "score"]);
    }

    #[test]
    fn pragma_catalog_returns_empty_for_unknown_table() {
        let conn = connection();
        let columns = PragmaCatalog.columns(&conn, "missing").expect("columns");
        assert!(columns.is_empty());
    }

    #[test]
    fn cached_catalog_ignores_later_schema_changes() {
        let conn = connection();
        let catalog = CachedCatalog::new(PragmaCatalog);
        assert_eq!(catalog.columns(&conn, "probes").expect("columns").len(), 3);

        conn.execute_batch("ALTER TABLE probes ADD COLUMN updated_at TEXT;")
            .expect("alter");
        assert_eq!(catalog.columns(&conn, "probes").expect("columns").len(), 3);
        assert_eq!(PragmaCatalog.columns(&conn, "probes").expect("columns").len(), 4);
    }

    #[test]
    fn quote_identifier_rejects_injection() {
        assert_eq!(quote_identifier("account_scores").unwrap(), "\"account_scores\"");
        assert!(matches!(
            quote_identifier("scores; DROP TABLE accounts"),
            Err(StoreError::InvalidIdentifier(_))
        ));
        assert!(quote_identifier("").is_err());
    }
}
