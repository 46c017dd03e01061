use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use super::domain::{
    CandidateId, CandidateStatus, FeatureCandidate, ScoreDefinition, TagDefinition,
};
use crate::store::{format_timestamp, Database, StoreError};

/// Storage abstraction so the review workflow can be exercised in isolation.
pub trait CandidateStore {
    fn find(&self, id: &CandidateId) -> Result<Option<FeatureCandidate>, StoreError>;

    /// Returns the number of rows updated.
    fn set_status(
        &self,
        id: &CandidateId,
        status: CandidateStatus,
        at: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    /// Returns `false` when a definition with the same id already exists.
    fn insert_tag_definition(&self, definition: &TagDefinition) -> Result<bool, StoreError>;

    /// Returns `false` when a definition with the same id already exists.
    fn insert_score_definition(&self, definition: &ScoreDefinition) -> Result<bool, StoreError>;

    /// Run `work` so that either all of its writes persist or none do.
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>;
}

/// [`CandidateStore`] over one SQLite connection, owned for a single request.
pub struct SqliteCandidateStore {
    conn: Connection,
}

impl SqliteCandidateStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(database: &Database) -> Result<Self, StoreError> {
        Ok(Self::new(database.connect()?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl CandidateStore for SqliteCandidateStore {
    fn find(&self, id: &CandidateId) -> Result<Option<FeatureCandidate>, StoreError> {
        let candidate = self
            .conn
            .query_row(
                "SELECT candidate_id, type, name_proposed, description_proposed, status
                 FROM feature_candidates
                 WHERE candidate_id = ?1",
                [id.as_str()],
                |row| {
                    Ok(FeatureCandidate {
                        candidate_id: CandidateId(row.get(0)?),
                        candidate_type: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        name_proposed: row.get(2)?,
                        description_proposed: row.get(3)?,
                        status: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(candidate)
    }

    fn set_status(
        &self,
        id: &CandidateId,
        status: CandidateStatus,
        at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let updated = self.conn.execute(
            "UPDATE feature_candidates SET status = ?1, updated_at = ?2 WHERE candidate_id = ?3",
            params![status.label(), format_timestamp(at), id.as_str()],
        )?;
        Ok(updated)
    }

    fn insert_tag_definition(&self, definition: &TagDefinition) -> Result<bool, StoreError> {
        let inserted = self.conn.execute(
            "INSERT INTO tag_definitions
               (tag_id, tag_code, tag_name, description, value_type, source_type,
                is_multi_valued, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT DO NOTHING",
            params![
                definition.tag_id,
                definition.tag_code,
                definition.tag_name,
                definition.description,
                definition.value_type,
                definition.source_type,
                definition.is_multi_valued,
                definition.is_active,
                definition.created_at,
                definition.updated_at,
            ],
        )?;
        Ok(inserted > 0)
    }

    fn insert_score_definition(&self, definition: &ScoreDefinition) -> Result<bool, StoreError> {
        let inserted = self.conn.execute(
            "INSERT INTO score_definitions
               (score_id, score_code, score_name, description, min_value, max_value,
                direction, source_type, refresh_interval, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT DO NOTHING",
            params![
                definition.score_id,
                definition.score_code,
                definition.score_name,
                definition.description,
                definition.min_value,
                definition.max_value,
                definition.direction,
                definition.source_type,
                definition.refresh_interval,
                definition.is_active,
                definition.created_at,
                definition.updated_at,
            ],
        )?;
        Ok(inserted > 0)
    }

    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>,
    {
        // Write lock is taken before the first read; competing reviewers wait
        // out the busy timeout and then see the committed status.
        // Dropping `tx` without commit rolls back.
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let value = work(self)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }
}
