//! Handler for `POST /upload`.
//!
//! The body is the raw sheet. `?filename=` picks the codec by extension;
//! without it the body is read as CSV.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use bytes::Bytes;
use querydesk_core::{
  import::{self, ImportReport},
  store::{QueryStore, SourceCatalog},
};
use serde::Deserialize;
use tracing::info;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize, Default)]
pub struct UploadParams {
  pub filename: Option<String>,
}

/// `POST /upload[?filename=...]`
pub async fn handler<S, C>(
  State(state): State<Arc<ApiState<S, C>>>,
  Query(params): Query<UploadParams>,
  body: Bytes,
) -> Result<Json<ImportReport>, ApiError>
where
  S: QueryStore,
  C: SourceCatalog,
{
  let table = match params.filename.as_deref() {
    Some(name) => querydesk_sheet::read_upload(name, &body)?,
    None => querydesk_sheet::read_csv(&body)?,
  };
  let plan = import::stage(&table)?;

  let report = state
    .store
    .import_batch(plan)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  info!(
    file = params.filename.as_deref().unwrap_or("<body>"),
    imported = report.success_count,
    failed = report.errors.len(),
    "upload processed"
  );
  Ok(Json(report))
}
