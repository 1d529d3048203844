//! Handlers for `/queries` and `/query/{id}` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/queries` | optional `edit_type`, `visit_type`, `form`, `status`, `search`, `page` |
//! | `GET`  | `/queries/filters` | distinct values for the list filters |
//! | `GET`  | `/query/{id}` | single record |
//! | `PUT`  | `/query/{id}` | Body: [`QueryPatch`]; returns the updated record |
//! | `GET`  | `/query/{id}/compare` | stored vs. current source value |

use std::{str::FromStr, sync::Arc};

use axum::{
  Json,
  extract::{Path, Query, State},
};
use querydesk_core::{
  compare::{ComparisonResult, compare_record},
  query::{FilterOptions, QueryFilter, QueryPage, QueryPatch, QueryRecord, Status},
  store::{QueryStore, SourceCatalog},
};
use serde::Deserialize;
use tracing::debug;

use crate::{ApiState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// List filters as sent by the review UI. Empty strings mean "any".
#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub edit_type:  Option<String>,
  pub visit_type: Option<String>,
  pub form:       Option<String>,
  /// One of the four status labels, e.g. `In Progress`.
  pub status:     Option<String>,
  pub search:     Option<String>,
  /// 1-based. Defaults to 1.
  pub page:       Option<u32>,
}

fn present(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<ListParams> for QueryFilter {
  type Error = ApiError;

  fn try_from(p: ListParams) -> Result<Self, ApiError> {
    let status = present(p.status)
      .map(|s| Status::from_str(&s).map_err(|_| ApiError::BadRequest(format!("unknown status: {s}"))))
      .transpose()?;

    Ok(QueryFilter {
      edit_type: present(p.edit_type),
      visit_type: present(p.visit_type),
      form: present(p.form),
      status,
      search: present(p.search).map(|s| s.trim().to_owned()),
      page: p.page.unwrap_or(1).max(1),
      ..QueryFilter::default()
    })
  }
}

/// `GET /queries[?edit_type=...][&visit_type=...][&form=...][&status=...][&search=...][&page=...]`
pub async fn list<S, C>(
  State(state): State<Arc<ApiState<S, C>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<QueryPage>, ApiError>
where
  S: QueryStore,
  C: SourceCatalog,
{
  let filter = QueryFilter::try_from(params)?;
  let page = state
    .store
    .list_queries(&filter)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(page))
}

/// `GET /queries/filters`
pub async fn filters<S, C>(
  State(state): State<Arc<ApiState<S, C>>>,
) -> Result<Json<FilterOptions>, ApiError>
where
  S: QueryStore,
  C: SourceCatalog,
{
  let options = state
    .store
    .filter_options()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(options))
}

// ─── Single record ────────────────────────────────────────────────────────────

async fn fetch<S: QueryStore>(store: &S, id: i64) -> Result<QueryRecord, ApiError> {
  store
    .get_query(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("query {id} not found")))
}

/// `GET /query/{id}`
pub async fn get_one<S, C>(
  State(state): State<Arc<ApiState<S, C>>>,
  Path(id): Path<i64>,
) -> Result<Json<QueryRecord>, ApiError>
where
  S: QueryStore,
  C: SourceCatalog,
{
  Ok(Json(fetch(&state.store, id).await?))
}

/// `PUT /query/{id}`
pub async fn update_one<S, C>(
  State(state): State<Arc<ApiState<S, C>>>,
  Path(id): Path<i64>,
  Json(patch): Json<QueryPatch>,
) -> Result<Json<QueryRecord>, ApiError>
where
  S: QueryStore,
  C: SourceCatalog,
{
  let record = state
    .store
    .update_query(id, patch)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("query {id} not found")))?;
  debug!(id, status = %record.status, "query updated");
  Ok(Json(record))
}

/// `GET /query/{id}/compare`
pub async fn compare_one<S, C>(
  State(state): State<Arc<ApiState<S, C>>>,
  Path(id): Path<i64>,
) -> Result<Json<ComparisonResult>, ApiError>
where
  S: QueryStore,
  C: SourceCatalog,
{
  let record = fetch(&state.store, id).await?;
  let result = compare_record(&state.catalog, &state.forms, &record).await;
  Ok(Json(result))
}
