//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as `YYYY-MM-DD`.
//! Imported fields are read and written through [`FIELDS`] so the column list
//! here can never drift from the import engine's.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use querydesk_core::{
  fields::FIELDS,
  query::{QueryFields, QueryRecord, Status},
};
use rusqlite::types::Value;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Status ──────────────────────────────────────────────────────────────────

pub fn encode_status(status: Status) -> &'static str {
  match status {
    Status::Pending => "Pending",
    Status::InProgress => "In Progress",
    Status::Resolved => "Resolved",
    Status::Closed => "Closed",
  }
}

pub fn decode_status(s: &str) -> Result<Status> {
  Status::from_str(s).map_err(|_| Error::UnknownStatus(s.to_owned()))
}

// ─── Imported fields ─────────────────────────────────────────────────────────

/// Comma-separated imported column names, in [`FIELDS`] order.
pub fn field_columns() -> String {
  FIELDS.iter().map(|f| f.sql_column).collect::<Vec<_>>().join(", ")
}

/// Bindable values for every imported field, in [`FIELDS`] order.
pub fn field_values(fields: &QueryFields) -> Vec<Value> {
  FIELDS
    .iter()
    .map(|f| f.read(fields).to_cell().map_or(Value::Null, Value::Text))
    .collect()
}

/// Text or `NULL`, for reviewer edits that clear a field with a blank string.
pub fn text_or_null(v: &str) -> Value {
  if v.trim().is_empty() { Value::Null } else { Value::Text(v.to_owned()) }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawQuery::from_row`].
pub fn select_columns() -> String {
  format!("id, query_id, {}, status, created_at, updated_at", field_columns())
}

/// Raw values read directly from a `queries` row.
pub struct RawQuery {
  pub id:         i64,
  pub query_id:   String,
  pub cells:      Vec<Option<String>>,
  pub status:     String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawQuery {
  /// Read a row selected with [`select_columns`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    let n = FIELDS.len();
    let cells = (0..n)
      .map(|i| row.get::<_, Option<String>>(i + 2))
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Self {
      id: row.get(0)?,
      query_id: row.get(1)?,
      cells,
      status: row.get(n + 2)?,
      created_at: row.get(n + 3)?,
      updated_at: row.get(n + 4)?,
    })
  }

  pub fn into_record(self) -> Result<QueryRecord> {
    let mut fields = QueryFields::default();
    for (spec, cell) in FIELDS.iter().zip(&self.cells) {
      spec.assign(&mut fields, cell.as_deref())?;
    }

    Ok(QueryRecord {
      id: self.id,
      query_id: self.query_id,
      fields,
      status: decode_status(&self.status)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
