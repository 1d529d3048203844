//! Error types for `querydesk-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The uploaded batch lacks one or more required columns. Nothing from the
  /// batch is written.
  #[error("missing required columns: {}", .0.join(", "))]
  SchemaMismatch(Vec<String>),

  #[error("unsafe identifier: {0:?}")]
  UnsafeIdentifier(String),

  #[error("unknown status: {0:?}")]
  UnknownStatus(String),

  #[error("invalid date in {column}: {value:?}")]
  InvalidDate { column: String, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
