//! Spreadsheet codec for querydesk.
//!
//! Decodes uploaded CSV and workbook sheets into a
//! [`querydesk_core::table::Table`] and encodes query records back to `.xlsx`
//! or CSV for export. Pure synchronous; no HTTP or database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use querydesk_sheet::read_csv;
//!
//! let table = read_csv(b"QueryID,Notes\nQ1,check\n").unwrap();
//! assert_eq!(table.rows.len(), 1);
//! ```

pub mod error;
mod read;
mod workbook;
mod write;

pub use error::{Error, Result};
pub use read::{read_csv, read_upload};
pub use workbook::{SHEET_NAME, read_workbook, write_xlsx};
pub use write::{ExportFormat, export_columns, write_csv};
