//! Handlers for `/bulk/*` endpoints.
//!
//! All selections are surrogate ids. Unknown ids are ignored; the returned
//! `count` reports what was actually affected.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
  http::header,
  response::IntoResponse,
};
use querydesk_core::{
  query::{QueryPatch, Status},
  store::{QueryStore, SourceCatalog},
};
use querydesk_sheet::ExportFormat;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ApiState, error::ApiError};

/// Body returned by every mutating bulk endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkResponse {
  pub success: bool,
  pub message: String,
  pub count:   usize,
}

impl BulkResponse {
  fn ok(message: String, count: usize) -> Json<Self> {
    Json(Self { success: true, message, count })
  }
}

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  #[serde(default)]
  pub query_ids: Vec<i64>,
  pub status:    Option<Status>,
}

/// `PUT /bulk/status` with `{"query_ids": [...], "status": "..."}`
pub async fn status<S, C>(
  State(state): State<Arc<ApiState<S, C>>>,
  Json(body): Json<StatusBody>,
) -> Result<Json<BulkResponse>, ApiError>
where
  S: QueryStore,
  C: SourceCatalog,
{
  let Some(status) = body.status.filter(|_| !body.query_ids.is_empty()) else {
    return Err(ApiError::BadRequest("missing query ids or status".into()));
  };

  let count = state
    .store
    .bulk_update_status(body.query_ids, status)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  info!(count, %status, "bulk status update");
  Ok(BulkResponse::ok(format!("Updated {count} queries to {status}"), count))
}

// ─── Edit ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EditBody {
  #[serde(default)]
  pub query_ids: Vec<i64>,
  /// Reviewer fields only; anything else in the object is ignored.
  #[serde(default)]
  pub updates:   QueryPatch,
}

/// `PUT /bulk/edit` with `{"query_ids": [...], "updates": {...}}`
pub async fn edit<S, C>(
  State(state): State<Arc<ApiState<S, C>>>,
  Json(body): Json<EditBody>,
) -> Result<Json<BulkResponse>, ApiError>
where
  S: QueryStore,
  C: SourceCatalog,
{
  if body.query_ids.is_empty() || body.updates.is_empty() {
    return Err(ApiError::BadRequest("missing query ids or updates".into()));
  }

  let count = state
    .store
    .bulk_edit(body.query_ids, body.updates)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  info!(count, "bulk edit");
  Ok(BulkResponse::ok(format!("Updated {count} queries"), count))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DeleteBody {
  #[serde(default)]
  pub query_ids: Vec<i64>,
}

/// `DELETE /bulk/delete` with `{"query_ids": [...]}`
pub async fn remove<S, C>(
  State(state): State<Arc<ApiState<S, C>>>,
  Json(body): Json<DeleteBody>,
) -> Result<Json<BulkResponse>, ApiError>
where
  S: QueryStore,
  C: SourceCatalog,
{
  if body.query_ids.is_empty() {
    return Err(ApiError::BadRequest("missing query ids".into()));
  }

  let count = state
    .store
    .bulk_delete(body.query_ids)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  info!(count, "bulk delete");
  Ok(BulkResponse::ok(format!("Deleted {count} queries"), count))
}

// ─── Export ───────────────────────────────────────────────────────────────────

/// Collect every `query_ids` value. Accepts repeated keys
/// (`?query_ids=1&query_ids=2`) and comma-separated lists (`?query_ids=1,2`).
fn export_ids(pairs: &[(String, String)]) -> Result<Vec<i64>, ApiError> {
  pairs
    .iter()
    .filter(|(k, _)| k == "query_ids")
    .flat_map(|(_, v)| v.split(',').map(str::trim).filter(|s| !s.is_empty()))
    .map(|s| {
      s.parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("invalid query id: {s}")))
    })
    .collect()
}

/// The last `format` value, `xlsx` when absent.
fn export_format(pairs: &[(String, String)]) -> Result<ExportFormat, ApiError> {
  match pairs.iter().rev().find(|(k, _)| k == "format") {
    None => Ok(ExportFormat::default()),
    Some((_, v)) => v.parse().map_err(|_| ApiError::BadRequest(format!("unknown export format: {v}"))),
  }
}

/// `GET /bulk/export?query_ids=1,2,3[&format=xlsx|csv]`
pub async fn export<S, C>(
  State(state): State<Arc<ApiState<S, C>>>,
  Query(pairs): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: QueryStore,
  C: SourceCatalog,
{
  let format = export_format(&pairs)?;
  let ids = export_ids(&pairs)?;
  if ids.is_empty() {
    return Err(ApiError::BadRequest("no queries selected".into()));
  }

  let records = state
    .store
    .get_queries_by_ids(ids)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  let bytes = format.encode(&records).map_err(ApiError::Export)?;
  info!(count = records.len(), ?format, "bulk export");

  Ok((
    [
      (header::CONTENT_TYPE, format.content_type().to_owned()),
      (
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{}\"", format.filename()),
      ),
    ],
    bytes,
  ))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
    raw.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
  }

  #[test]
  fn export_ids_accept_lists_and_repeats() {
    let ids = export_ids(&pairs(&[("query_ids", "1, 2"), ("query_ids", "7"), ("x", "9")])).unwrap();
    assert_eq!(ids, vec![1, 2, 7]);
    assert!(export_ids(&pairs(&[("query_ids", "")])).unwrap().is_empty());
    assert!(matches!(
      export_ids(&pairs(&[("query_ids", "1,abc")])),
      Err(ApiError::BadRequest(_))
    ));
  }

  #[test]
  fn export_format_defaults_to_workbook() {
    assert_eq!(export_format(&pairs(&[("query_ids", "1")])).unwrap(), ExportFormat::Xlsx);
    assert_eq!(export_format(&pairs(&[("format", "csv")])).unwrap(), ExportFormat::Csv);
    assert!(matches!(export_format(&pairs(&[("format", "pdf")])), Err(ApiError::BadRequest(_))));
  }
}
