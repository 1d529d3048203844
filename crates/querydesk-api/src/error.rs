//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unsupported file type: {0}")]
  UnsupportedFormat(String),

  /// The uploaded sheet lacks required columns; nothing was written.
  #[error("missing required columns: {}", .0.join(", "))]
  SchemaMismatch(Vec<String>),

  #[error("export failed: {0}")]
  Export(#[source] querydesk_sheet::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<querydesk_sheet::Error> for ApiError {
  fn from(e: querydesk_sheet::Error) -> Self {
    match e {
      querydesk_sheet::Error::UnsupportedFormat(name) => ApiError::UnsupportedFormat(name),
      other => ApiError::BadRequest(other.to_string()),
    }
  }
}

impl From<querydesk_core::Error> for ApiError {
  fn from(e: querydesk_core::Error) -> Self {
    match e {
      querydesk_core::Error::SchemaMismatch(missing) => ApiError::SchemaMismatch(missing),
      other => ApiError::BadRequest(other.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::UnsupportedFormat(_) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, self.to_string()),
      ApiError::SchemaMismatch(missing) => {
        let body = json!({
          "error": self.to_string(),
          "successCount": 0,
          "errors": [],
          "missingColumns": missing,
        });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
      }
      ApiError::Export(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
