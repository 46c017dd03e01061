use std::fmt::Write as _;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{Params, Statement};
use serde::Serialize;
use serde_json::{Map, Number, Value};

use super::StoreError;

/// One result row keyed by column name, in select-list order.
pub type Row = Map<String, Value>;

/// Rows plus the column names the statement produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Wire format for every timestamp this service writes or returns.
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.with_timezone(&Utc));
    }
    if let Ok(value) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(value.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn is_temporal(decl_type: Option<&str>) -> bool {
    decl_type
        .map(|decl| {
            let decl = decl.to_ascii_uppercase();
            decl.contains("DATE") || decl.contains("TIME")
        })
        .unwrap_or(false)
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn cell_to_json(value: ValueRef<'_>, temporal: bool) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(number) => Value::from(number),
        ValueRef::Real(number) => Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            if temporal {
                if let Some(timestamp) = parse_timestamp(&text) {
                    return Value::String(format_timestamp(timestamp));
                }
            }
            Value::String(text.into_owned())
        }
        ValueRef::Blob(bytes) => Value::String(hex(bytes)),
    }
}

/// Run a prepared statement and convert every row into a JSON mapping.
pub fn collect_rows<P: Params>(stmt: &mut Statement<'_>, params: P) -> Result<RowSet, StoreError> {
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let temporal: Vec<bool> = stmt
        .columns()
        .iter()
        .map(|column| is_temporal(column.decl_type()))
        .collect();

    let mut rows = Vec::new();
    let mut cursor = stmt.query(params)?;
    while let Some(row) = cursor.next()? {
        let mut mapped = Map::with_capacity(columns.len());
        for (index, name) in columns.iter().enumerate() {
            let value = cell_to_json(row.get_ref(index)?, temporal[index]);
            mapped.insert(name.clone(), value);
        }
        rows.push(mapped);
    }

    Ok(RowSet { columns, rows })
}
