//! [`Table`]: an ordered batch of named-field rows handed to the importer.
//!
//! File decoding lives elsewhere (`querydesk-sheet`); this is the shape the
//! core expects once a file has been read.

use crate::import::RowError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
  pub headers:  Vec<String>,
  /// Row cells in header order. Short rows are padded with `None` on read.
  pub rows:     Vec<Vec<Option<String>>>,
  /// Rows the decoder could not read. Each keeps its position in `rows` as an
  /// empty placeholder so later row indexes do not shift.
  pub rejected: Vec<RowError>,
}

impl Table {
  pub fn new(headers: Vec<String>) -> Self {
    Self { headers, rows: Vec::new(), rejected: Vec::new() }
  }

  /// Position of a header, compared exactly.
  pub fn column_index(&self, name: &str) -> Option<usize> {
    self.headers.iter().position(|h| h == name)
  }

  pub fn push_row(&mut self, row: Vec<Option<String>>) { self.rows.push(row); }

  /// Record an undecodable row at the next position.
  pub fn push_rejected(&mut self, message: impl Into<String>) {
    let row_index = self.rows.len();
    self.rows.push(Vec::new());
    self.rejected.push(RowError { row_index, message: message.into() });
  }

  /// Decode failure recorded for `row`, if any.
  pub fn rejection(&self, row: usize) -> Option<&RowError> {
    self.rejected.iter().find(|e| e.row_index == row)
  }

  /// A cell by row and column position; `None` when out of range or empty.
  pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
    self.rows.get(row)?.get(column)?.as_deref()
  }
}
