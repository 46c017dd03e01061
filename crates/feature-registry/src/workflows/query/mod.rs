//! Parameterized, limit-bounded reads over the feature store tables.
//!
//! [`fetch_table_rows`] is the generic path: filters are matched against the
//! live column list so a missing column degrades to "no filter" instead of a
//! failed request. The fixed endpoint reads live in [`listings`].

pub mod listings;

use std::collections::HashMap;

use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::store::rows::collect_rows;
use crate::store::{quote_identifier, RowSet, StoreError, TableCatalog};

pub use listings::{
    list_account_scores, list_account_tags, list_feature_candidates, list_score_definitions,
    list_tag_definitions, AccountTagFilter, CandidateFilter, DefinitionFilter,
};

/// Columns probed, in priority order, for the implicit newest-first ordering.
pub const RECENCY_COLUMNS: [&str; 3] = ["evaluated_at", "updated_at", "created_at"];

/// Row limit accepted by the listing endpoints, always within `1..=2000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimit(u32);

impl QueryLimit {
    pub const DEFAULT: u32 = 200;
    pub const MAX: u32 = 2000;

    pub fn clamp(value: i64) -> Self {
        Self(value.clamp(1, i64::from(Self::MAX)) as u32)
    }

    /// Absent or non-integer input falls back to the default; integers are clamped.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim) else {
            return Self::default();
        };

        match raw.parse::<i64>() {
            Ok(value) => Self::clamp(value),
            Err(_) if is_integer_literal(raw) => {
                // Out of i64 range: the sign decides which bound applies.
                if raw.starts_with('-') {
                    Self::clamp(i64::MIN)
                } else {
                    Self::clamp(i64::MAX)
                }
            }
            Err(_) => Self::default(),
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for QueryLimit {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

fn is_integer_literal(raw: &str) -> bool {
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit())
}

/// Maps a request parameter onto the table column it filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnFilter<'a> {
    pub param: &'a str,
    pub column: &'a str,
}

impl<'a> ColumnFilter<'a> {
    pub const fn new(param: &'a str, column: &'a str) -> Self {
        Self { param, column }
    }

    /// Filter whose request parameter carries the column's own name.
    pub const fn same(column: &'a str) -> Self {
        Self::new(column, column)
    }
}

/// SQL and bound values for one generic table read.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectPlan {
    pub sql: String,
    pub params: Vec<SqlValue>,
    pub order_by: Option<String>,
    pub dropped_filters: Vec<String>,
}

/// Build the statement for `table` given the columns it actually has.
pub fn plan_select(
    table: &str,
    available: &[String],
    filters: &[ColumnFilter<'_>],
    params: &HashMap<String, String>,
    limit: QueryLimit,
) -> Result<SelectPlan, StoreError> {
    let table_sql = quote_identifier(table)?;
    let has_column = |name: &str| available.iter().any(|column| column == name);

    let mut where_parts = Vec::new();
    let mut values = Vec::new();
    let mut dropped_filters = Vec::new();

    for filter in filters {
        let Some(value) = params.get(filter.param) else {
            continue;
        };
        if !has_column(filter.column) {
            warn!(
                table,
                column = filter.column,
                "ignoring filter because column is missing"
            );
            dropped_filters.push(filter.column.to_string());
            continue;
        }
        where_parts.push(format!("{} = ?", quote_identifier(filter.column)?));
        values.push(SqlValue::Text(value.clone()));
    }

    let order_by = RECENCY_COLUMNS
        .iter()
        .find(|column| has_column(column))
        .map(|column| column.to_string());

    let mut sql = format!("SELECT * FROM {table_sql}");
    if !where_parts.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_parts.join(" AND "));
    }
    if let Some(column) = &order_by {
        sql.push_str(&format!(" ORDER BY {} DESC", quote_identifier(column)?));
    }
    sql.push_str(" LIMIT ?");
    values.push(SqlValue::Integer(i64::from(limit.get())));

    Ok(SelectPlan {
        sql,
        params: values,
        order_by,
        dropped_filters,
    })
}

/// Generic filtered read: rows of `table` matching every applicable filter,
/// newest first when the table has a recency column.
pub fn fetch_table_rows(
    conn: &Connection,
    catalog: &dyn TableCatalog,
    table: &str,
    filters: &[ColumnFilter<'_>],
    params: &HashMap<String, String>,
    limit: QueryLimit,
) -> Result<RowSet, StoreError> {
    let available = catalog.columns(conn, table)?;
    let plan = plan_select(table, &available, filters, params, limit)?;
    debug!(table, sql = %plan.sql, "fetching table rows");

    let mut stmt = conn.prepare(&plan.sql)?;
    collect_rows(&mut stmt, rusqlite::params_from_iter(plan.params.iter()))
}
