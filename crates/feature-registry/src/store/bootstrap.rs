//! Schema for a local feature store. Production tables are owned by the
//! analytics platform; this DDL mirrors their shape for development and tests.

use rusqlite::Connection;
use tracing::info;

use super::StoreError;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS feature_candidates (
        candidate_id         TEXT PRIMARY KEY,
        type                 TEXT NOT NULL,
        source               TEXT,
        name_proposed        TEXT,
        description_proposed TEXT,
        logic_proposed       TEXT,
        status               TEXT NOT NULL DEFAULT 'new',
        created_at           DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        updated_at           DATETIME
    );

    CREATE INDEX IF NOT EXISTS idx_candidates_type_status
        ON feature_candidates(type, status);

    CREATE TABLE IF NOT EXISTS tag_definitions (
        tag_id          TEXT PRIMARY KEY,
        tag_code        TEXT,
        tag_name        TEXT,
        description     TEXT,
        value_type      TEXT,
        source_type     TEXT,
        is_multi_valued INTEGER NOT NULL DEFAULT 0,
        is_active       INTEGER NOT NULL DEFAULT 1,
        created_at      DATETIME,
        updated_at      DATETIME
    );

    CREATE TABLE IF NOT EXISTS score_definitions (
        score_id         TEXT PRIMARY KEY,
        score_code       TEXT,
        score_name       TEXT,
        description      TEXT,
        min_value        REAL,
        max_value        REAL,
        direction        TEXT,
        source_type      TEXT,
        refresh_interval TEXT,
        is_active        INTEGER NOT NULL DEFAULT 1,
        created_at       DATETIME,
        updated_at       DATETIME
    );

    CREATE TABLE IF NOT EXISTS accounts (
        account_id   TEXT PRIMARY KEY,
        company_name TEXT,
        account_name TEXT,
        name         TEXT
    );

    CREATE TABLE IF NOT EXISTS account_tags (
        account_id       TEXT NOT NULL,
        tag_id           TEXT NOT NULL,
        tag_value        TEXT,
        confidence_score REAL,
        created_at       DATETIME
    );

    CREATE INDEX IF NOT EXISTS idx_account_tags_account ON account_tags(account_id);

    CREATE TABLE IF NOT EXISTS account_scores (
        account_id   TEXT NOT NULL,
        score_id     TEXT NOT NULL,
        score_value  REAL,
        evaluated_at DATETIME,
        created_at   DATETIME
    );

    CREATE INDEX IF NOT EXISTS idx_account_scores_account ON account_scores(account_id);
";

/// Create any missing feature-store tables.
pub fn apply(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(SCHEMA)?;
    info!("feature store schema applied");
    Ok(())
}
