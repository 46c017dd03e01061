use std::collections::HashMap;

use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;

use super::{fetch_table_rows, ColumnFilter, QueryLimit};
use crate::store::rows::collect_rows;
use crate::store::{Row, RowSet, StoreError, TableCatalog};

const CANDIDATE_LIMIT: i64 = 100;
const DEFAULT_CANDIDATE_TYPE: &str = "behavior_feature";
const DEFAULT_CANDIDATE_STATUS: &str = "new";

/// Display order of the account tag grid, independent of the select list.
pub const ACCOUNT_TAG_COLUMNS: [&str; 7] = [
    "account_name",
    "tag_name",
    "tag_value",
    "confidence_score",
    "created_at",
    "account_id",
    "tag_id",
];

const ACCOUNT_SCORE_FILTERS: [ColumnFilter<'static>; 2] = [
    ColumnFilter::same("account_id"),
    ColumnFilter::same("score_id"),
];

fn truthy(raw: Option<&String>) -> bool {
    raw.map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn non_empty(raw: Option<&String>) -> Option<String> {
    raw.filter(|value| !value.is_empty()).cloned()
}

/// Review queue selection for the candidate listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFilter {
    pub candidate_type: String,
    pub status: String,
}

impl CandidateFilter {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            candidate_type: params
                .get("type")
                .cloned()
                .unwrap_or_else(|| DEFAULT_CANDIDATE_TYPE.to_string()),
            status: params
                .get("status")
                .cloned()
                .unwrap_or_else(|| DEFAULT_CANDIDATE_STATUS.to_string()),
        }
    }
}

impl Default for CandidateFilter {
    fn default() -> Self {
        Self::from_params(&HashMap::new())
    }
}

pub fn list_feature_candidates(
    conn: &Connection,
    filter: &CandidateFilter,
) -> Result<Vec<Row>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT candidate_id, type, source, name_proposed, description_proposed,
                logic_proposed, status, created_at
         FROM feature_candidates
         WHERE type = ?1 AND status = ?2
         ORDER BY created_at DESC
         LIMIT ?3",
    )?;
    let set = collect_rows(
        &mut stmt,
        rusqlite::params![filter.candidate_type, filter.status, CANDIDATE_LIMIT],
    )?;
    Ok(set.rows)
}

/// Shared selection for the tag and score master listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DefinitionFilter {
    pub include_inactive: bool,
    pub limit: QueryLimit,
}

impl DefinitionFilter {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            include_inactive: truthy(params.get("include_inactive")),
            limit: QueryLimit::parse(params.get("limit").map(String::as_str)),
        }
    }

    fn where_clause(&self) -> &'static str {
        if self.include_inactive {
            ""
        } else {
            "WHERE is_active = 1"
        }
    }
}

pub fn list_tag_definitions(
    conn: &Connection,
    filter: &DefinitionFilter,
) -> Result<Vec<Row>, StoreError> {
    let sql = format!(
        "SELECT tag_id, tag_name, description, created_at
         FROM tag_definitions
         {}
         ORDER BY created_at DESC
         LIMIT ?1",
        filter.where_clause()
    );
    let mut stmt = conn.prepare(&sql)?;
    let set = collect_rows(&mut stmt, [i64::from(filter.limit.get())])?;
    Ok(set.rows)
}

pub fn list_score_definitions(
    conn: &Connection,
    filter: &DefinitionFilter,
) -> Result<Vec<Row>, StoreError> {
    let sql = format!(
        "SELECT score_id, score_code, score_name, description, min_value, max_value,
                direction, source_type, refresh_interval, is_active, created_at, updated_at
         FROM score_definitions
         {}
         ORDER BY updated_at DESC, created_at DESC
         LIMIT ?1",
        filter.where_clause()
    );
    let mut stmt = conn.prepare(&sql)?;
    let set = collect_rows(&mut stmt, [i64::from(filter.limit.get())])?;
    Ok(set.rows)
}

/// Account/tag selection; empty parameters count as absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountTagFilter {
    pub account_id: Option<String>,
    pub tag_id: Option<String>,
    pub limit: QueryLimit,
}

impl AccountTagFilter {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            account_id: non_empty(params.get("account_id")),
            tag_id: non_empty(params.get("tag_id")),
            limit: QueryLimit::parse(params.get("limit").map(String::as_str)),
        }
    }
}

/// Tag assignments joined with the account display name and tag name.
pub fn list_account_tags(
    conn: &Connection,
    filter: &AccountTagFilter,
) -> Result<RowSet, StoreError> {
    let mut where_parts = Vec::new();
    let mut values = Vec::new();
    if let Some(account_id) = &filter.account_id {
        where_parts.push("at.account_id = ?");
        values.push(SqlValue::Text(account_id.clone()));
    }
    if let Some(tag_id) = &filter.tag_id {
        where_parts.push("at.tag_id = ?");
        values.push(SqlValue::Text(tag_id.clone()));
    }
    values.push(SqlValue::Integer(i64::from(filter.limit.get())));

    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", where_parts.join(" AND "))
    };

    let sql = format!(
        "SELECT at.account_id,
                at.tag_id,
                at.tag_value,
                at.confidence_score,
                at.created_at,
                COALESCE(a.company_name, a.account_name, a.name) AS account_name,
                td.tag_name
         FROM account_tags AS at
         LEFT JOIN tag_definitions AS td ON at.tag_id = td.tag_id
         LEFT JOIN accounts AS a ON at.account_id = a.account_id
         {where_clause}
         ORDER BY at.created_at DESC
         LIMIT ?"
    );

    let mut stmt = conn.prepare(&sql)?;
    let set = collect_rows(&mut stmt, rusqlite::params_from_iter(values.iter()))?;
    Ok(RowSet {
        columns: ACCOUNT_TAG_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows: set.rows,
    })
}

/// Account scores through the generic filtered read.
pub fn list_account_scores(
    conn: &Connection,
    catalog: &dyn TableCatalog,
    params: &HashMap<String, String>,
) -> Result<RowSet, StoreError> {
    let limit = QueryLimit::parse(params.get("limit").map(String::as_str));
    fetch_table_rows(
        conn,
        catalog,
        "account_scores",
        &ACCOUNT_SCORE_FILTERS,
        params,
        limit,
    )
}
