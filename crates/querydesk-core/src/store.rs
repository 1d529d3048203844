//! Storage traits the engines are written against.
//!
//! - [`QueryWriter`] is the synchronous, in-transaction surface the batch
//!   upsert engine drives row by row.
//! - [`SourceCatalog`] is read-only access to the source forms: catalog
//!   lookups plus the single-row [`SelectOne`] read.
//! - [`QueryStore`] is the async facade the HTTP layer and the CLI use.
//!
//! Implemented by storage backends (e.g. `querydesk-store-sqlite`).

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  ident::Identifier,
  import::{ImportPlan, ImportReport},
  query::{FilterOptions, QueryFields, QueryFilter, QueryPage, QueryPatch, QueryRecord, Status},
  select::SelectOne,
};

// ─── In-transaction writes ───────────────────────────────────────────────────

/// Row-level writes issued by [`crate::import::apply`] inside one storage
/// transaction. The caller owns commit and rollback.
pub trait QueryWriter {
  type Error: std::error::Error;

  /// Surrogate id of the record carrying `query_id`, if any.
  fn find_id_by_query_id(&mut self, query_id: &str) -> Result<Option<i64>, Self::Error>;

  /// Create a record and return its surrogate id. `created_at` and
  /// `updated_at` are both set to `now`.
  fn insert(
    &mut self,
    query_id: &str,
    fields: &QueryFields,
    status: Status,
    now: DateTime<Utc>,
  ) -> Result<i64, Self::Error>;

  /// Overwrite every imported field of record `id` and refresh `updated_at`.
  /// Must not touch `status` or `created_at`.
  fn update(&mut self, id: i64, fields: &QueryFields, now: DateTime<Utc>)
  -> Result<(), Self::Error>;

  /// Whether `err` is confined to the row that raised it (e.g. a constraint
  /// violation) rather than a failure of the whole transaction.
  fn is_row_scoped(err: &Self::Error) -> bool;
}

// ─── Source forms ────────────────────────────────────────────────────────────

/// Live, uncached, read-only view of the source forms' schema and rows.
pub trait SourceCatalog: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn table_exists<'a>(
    &'a self,
    table: &'a Identifier,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn column_exists<'a>(
    &'a self,
    table: &'a Identifier,
    column: &'a Identifier,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Run `query` and return the selected cell as text. `None` when no row
  /// matched or the cell is `NULL`.
  fn select_one<'a>(
    &'a self,
    query: &'a SelectOne,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;
}

// ─── Query records ───────────────────────────────────────────────────────────

/// Abstraction over a query-record store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait QueryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Apply a staged batch in one transaction. Row-scoped failures are
  /// reported in the returned [`ImportReport`]; anything else rolls the whole
  /// batch back and is returned as `Err`.
  fn import_batch(
    &self,
    plan: ImportPlan,
  ) -> impl Future<Output = Result<ImportReport, Self::Error>> + Send + '_;

  /// Retrieve a record by surrogate id. Returns `None` if not found.
  fn get_query(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<QueryRecord>, Self::Error>> + Send + '_;

  /// Filtered, paginated listing ordered by id.
  fn list_queries<'a>(
    &'a self,
    filter: &'a QueryFilter,
  ) -> impl Future<Output = Result<QueryPage, Self::Error>> + Send + 'a;

  /// Distinct non-empty `EditType`, `VisitType` and `Form` values.
  fn filter_options(
    &self,
  ) -> impl Future<Output = Result<FilterOptions, Self::Error>> + Send + '_;

  /// Apply a reviewer edit to one record. Returns the updated record, or
  /// `None` if `id` does not exist.
  fn update_query(
    &self,
    id: i64,
    patch: QueryPatch,
  ) -> impl Future<Output = Result<Option<QueryRecord>, Self::Error>> + Send + '_;

  /// Set `status` on every record in `ids` in one statement. Returns the
  /// number of records changed.
  fn bulk_update_status(
    &self,
    ids: Vec<i64>,
    status: Status,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Apply `patch` to every record in `ids` in one statement.
  fn bulk_edit(
    &self,
    ids: Vec<i64>,
    patch: QueryPatch,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Delete every record in `ids`. Returns the number deleted.
  fn bulk_delete(
    &self,
    ids: Vec<i64>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Fetch records for export, ordered by id. Unknown ids are skipped.
  fn get_queries_by_ids(
    &self,
    ids: Vec<i64>,
  ) -> impl Future<Output = Result<Vec<QueryRecord>, Self::Error>> + Send + '_;
}
