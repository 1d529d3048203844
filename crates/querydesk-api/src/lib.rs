//! JSON REST API for querydesk.
//!
//! Exposes an axum [`Router`] backed by any [`QueryStore`] for the query
//! records and any [`SourceCatalog`] for the live source forms. Auth, TLS and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", querydesk_api::api_router(state.clone()))
//! ```

pub mod bulk;
pub mod error;
pub mod queries;
pub mod upload;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{delete, get, post, put},
};
use querydesk_core::{
  classify::FormClassification,
  store::{QueryStore, SourceCatalog},
};

pub use error::ApiError;

/// Largest accepted upload body.
pub const UPLOAD_LIMIT: usize = 16 * 1024 * 1024;

/// Shared state threaded through all handlers.
pub struct ApiState<S, C> {
  pub store:   S,
  pub catalog: C,
  pub forms:   FormClassification,
}

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, C>(state: Arc<ApiState<S, C>>) -> Router<()>
where
  S: QueryStore + 'static,
  C: SourceCatalog + 'static,
{
  Router::new()
    // Import
    .route(
      "/upload",
      post(upload::handler::<S, C>).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
    )
    // Records
    .route("/queries", get(queries::list::<S, C>))
    .route("/queries/filters", get(queries::filters::<S, C>))
    .route("/query/{id}", get(queries::get_one::<S, C>).put(queries::update_one::<S, C>))
    .route("/query/{id}/compare", get(queries::compare_one::<S, C>))
    // Bulk
    .route("/bulk/status", put(bulk::status::<S, C>))
    .route("/bulk/edit", put(bulk::edit::<S, C>))
    .route("/bulk/delete", delete(bulk::remove::<S, C>))
    .route("/bulk/export", get(bulk::export::<S, C>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
