//! Excel and OpenDocument workbooks: first-sheet decode and `.xlsx` export.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use querydesk_core::{query::QueryRecord, table::Table};
use rust_xlsxwriter::{Format, Workbook};
use tracing::debug;

use crate::{
  Error, Result,
  write::{export_columns, export_row},
};

/// Worksheet name used for exports.
pub const SHEET_NAME: &str = "Queries";

/// Decode the first worksheet of a workbook; its first row is the header.
///
/// Date cells read as `YYYY-MM-DD`, numbers in their shortest decimal form,
/// and blank or error cells as `None`. Rows with no cells at all are skipped,
/// matching how the CSV reader treats empty lines.
pub fn read_workbook(bytes: &[u8]) -> Result<Table> {
  let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
  let range = workbook.worksheet_range_at(0).ok_or(Error::MissingHeader)??;

  let mut rows = range.rows();
  let headers: Vec<String> = rows
    .next()
    .ok_or(Error::MissingHeader)?
    .iter()
    .map(|c| cell_text(c).map(|h| h.trim().to_owned()).unwrap_or_default())
    .collect();
  if headers.iter().all(|h| h.is_empty()) {
    return Err(Error::MissingHeader);
  }

  let mut table = Table::new(headers);
  let width = table.headers.len();
  for row in rows {
    let cells: Vec<Option<String>> = (0..width).map(|i| row.get(i).and_then(cell_text)).collect();
    if cells.iter().all(Option::is_none) {
      continue;
    }
    table.push_row(cells);
  }

  debug!(columns = width, rows = table.rows.len(), "decoded workbook sheet");
  Ok(table)
}

fn cell_text(cell: &Data) -> Option<String> {
  let text = match cell {
    Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    Data::Int(i) => i.to_string(),
    Data::Float(f) => f.to_string(),
    Data::Bool(b) => b.to_string(),
    Data::DateTime(dt) => {
      return dt.as_datetime().map(|d| d.date().format("%Y-%m-%d").to_string());
    }
    _ => return None,
  };
  (!text.trim().is_empty()).then_some(text)
}

/// Encode `records` as a single-sheet `.xlsx` in [`export_columns`] order.
/// Every cell is written as text, so dates stay `YYYY-MM-DD`.
pub fn write_xlsx(records: &[QueryRecord]) -> Result<Vec<u8>> {
  let mut workbook = Workbook::new();
  let bold = Format::new().set_bold();
  let sheet = workbook.add_worksheet().set_name(SHEET_NAME)?;

  for (col, name) in export_columns().enumerate() {
    sheet.write_string_with_format(0, column(col), name, &bold)?;
  }
  for (i, record) in records.iter().enumerate() {
    let row = u32::try_from(i + 1).unwrap_or(u32::MAX);
    for (col, value) in export_row(record).into_iter().enumerate() {
      if let Some(value) = value {
        sheet.write_string(row, column(col), value)?;
      }
    }
  }

  Ok(workbook.save_to_buffer()?)
}

fn column(index: usize) -> u16 { u16::try_from(index).unwrap_or(u16::MAX) }
