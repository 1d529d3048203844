//! The batch upsert engine.
//!
//! Importing happens in two steps:
//!
//! 1. [`stage`] checks the header set and turns every row into a
//!    [`StagedRow`] or a [`RowError`]. Pure; no storage involved.
//! 2. [`apply`] runs the find-or-create against a [`QueryWriter`] inside a
//!    transaction the storage backend owns.
//!
//! A missing column rejects the batch before anything is staged. A bad row is
//! recorded and skipped. Only a storage failure that is not row-scoped aborts
//! the batch, and the backend then rolls back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
  Error, Result,
  fields::{FIELDS, QUERY_ID, required_columns},
  query::{QueryFields, Status, non_blank},
  store::QueryWriter,
  table::Table,
};

// ─── Result types ────────────────────────────────────────────────────────────

/// A row that was skipped, by 0-based data-row position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
  pub row_index: usize,
  pub message:   String,
}

/// Outcome of one import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
  pub success_count:   usize,
  pub errors:          Vec<RowError>,
  /// Set only when the batch was rejected for missing columns.
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub missing_columns: Option<Vec<String>>,
}

impl ImportReport {
  /// The report for a batch rejected before staging.
  pub fn rejected(missing: Vec<String>) -> Self {
    Self { missing_columns: Some(missing), ..Default::default() }
  }
}

/// A row ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRow {
  pub row_index: usize,
  pub query_id:  String,
  pub fields:    QueryFields,
}

/// A validated batch: staged rows plus rows already rejected at parse time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportPlan {
  pub rows:   Vec<StagedRow>,
  pub errors: Vec<RowError>,
}

// ─── Staging ─────────────────────────────────────────────────────────────────

/// Required headers absent from `table`, in required order.
pub fn missing_columns(table: &Table) -> Vec<String> {
  required_columns()
    .filter(|col| table.column_index(col).is_none())
    .map(str::to_owned)
    .collect()
}

/// Validate the header set and stage every row.
///
/// Returns [`Error::SchemaMismatch`] if any required column is absent.
pub fn stage(table: &Table) -> Result<ImportPlan> {
  let missing = missing_columns(table);
  if !missing.is_empty() {
    return Err(Error::SchemaMismatch(missing));
  }

  // Both lookups are infallible after the check above.
  let key_idx = table.column_index(QUERY_ID).unwrap_or_default();
  let field_idx: Vec<usize> = FIELDS
    .iter()
    .map(|f| table.column_index(f.column).unwrap_or_default())
    .collect();

  let mut plan = ImportPlan::default();
  for row_index in 0..table.rows.len() {
    if let Some(rejected) = table.rejection(row_index) {
      debug!(row_index, message = %rejected.message, "skipping undecodable row");
      plan.errors.push(rejected.clone());
      continue;
    }

    let staged = non_blank(table.cell(row_index, key_idx))
      .ok_or_else(|| format!("{QUERY_ID} is empty"))
      .and_then(|query_id| {
        let mut fields = QueryFields::default();
        for (spec, &idx) in FIELDS.iter().zip(&field_idx) {
          spec
            .assign(&mut fields, table.cell(row_index, idx))
            .map_err(|e| e.to_string())?;
        }
        Ok(StagedRow { row_index, query_id: query_id.to_owned(), fields })
      });

    match staged {
      Ok(row) => plan.rows.push(row),
      Err(message) => {
        debug!(row_index, %message, "skipping row");
        plan.errors.push(RowError { row_index, message });
      }
    }
  }

  Ok(plan)
}

// ─── Applying ────────────────────────────────────────────────────────────────

/// Upsert every staged row through `writer`.
///
/// Existing records (by `QueryID`) have all imported fields overwritten and
/// keep their `status`; new records start as [`Status::Pending`]. A
/// row-scoped writer error is recorded against that row. Any other writer
/// error is returned immediately and the caller must roll back.
pub fn apply<W: QueryWriter>(
  writer: &mut W,
  plan: ImportPlan,
  now: DateTime<Utc>,
) -> Result<ImportReport, W::Error> {
  let ImportPlan { rows, mut errors } = plan;
  let mut created = 0usize;
  let mut updated = 0usize;

  for row in rows {
    match upsert_row(writer, &row, now) {
      Ok(Upsert::Created) => created += 1,
      Ok(Upsert::Updated) => updated += 1,
      Err(e) if W::is_row_scoped(&e) => {
        debug!(row_index = row.row_index, query_id = %row.query_id, error = %e, "row rejected by store");
        errors.push(RowError { row_index: row.row_index, message: e.to_string() });
      }
      Err(e) => return Err(e),
    }
  }

  errors.sort_by_key(|e| e.row_index);
  info!(created, updated, skipped = errors.len(), "import applied");

  Ok(ImportReport {
    success_count: created + updated,
    errors,
    missing_columns: None,
  })
}

enum Upsert {
  Created,
  Updated,
}

fn upsert_row<W: QueryWriter>(
  writer: &mut W,
  row: &StagedRow,
  now: DateTime<Utc>,
) -> Result<Upsert, W::Error> {
  match writer.find_id_by_query_id(&row.query_id)? {
    Some(id) => {
      writer.update(id, &row.fields, now)?;
      Ok(Upsert::Updated)
    }
    None => {
      writer.insert(&row.query_id, &row.fields, Status::default(), now)?;
      Ok(Upsert::Created)
    }
  }
}
