//! Error types for the querydesk-sheet codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("sheet has no header row")]
  MissingHeader,

  #[error("malformed CSV: {0}")]
  Csv(#[from] csv::Error),

  #[error("CSV writer: {0}")]
  Io(#[from] std::io::Error),

  #[error("unreadable workbook: {0}")]
  Workbook(#[from] calamine::Error),

  #[error("workbook writer: {0}")]
  Xlsx(#[from] rust_xlsxwriter::XlsxError),

  #[error("unsupported sheet format: {0}")]
  UnsupportedFormat(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
