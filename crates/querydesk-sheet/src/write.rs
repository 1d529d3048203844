use std::str::FromStr;

use querydesk_core::{
  fields::{FIELDS, QUERY_ID},
  query::QueryRecord,
};

use crate::{Error, Result, workbook::write_xlsx};

/// Container an export is encoded into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
  #[default]
  Xlsx,
  Csv,
}

impl ExportFormat {
  /// Attachment name for the download.
  pub fn filename(self) -> &'static str {
    match self {
      Self::Xlsx => "exported_queries.xlsx",
      Self::Csv => "exported_queries.csv",
    }
  }

  pub fn content_type(self) -> &'static str {
    match self {
      Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
      Self::Csv => "text/csv; charset=utf-8",
    }
  }

  pub fn encode(self, records: &[QueryRecord]) -> Result<Vec<u8>> {
    match self {
      Self::Xlsx => write_xlsx(records),
      Self::Csv => write_csv(records),
    }
  }
}

impl FromStr for ExportFormat {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "xlsx" => Ok(Self::Xlsx),
      "csv" => Ok(Self::Csv),
      _ => Err(Error::UnsupportedFormat(s.to_owned())),
    }
  }
}

/// Export header: the import columns followed by `status`.
pub fn export_columns() -> impl Iterator<Item = &'static str> {
  std::iter::once(QUERY_ID)
    .chain(FIELDS.iter().map(|f| f.column))
    .chain(std::iter::once("status"))
}

/// One record's cells in [`export_columns`] order. Dates render as
/// `YYYY-MM-DD`, so an export re-imports cleanly.
pub(crate) fn export_row(record: &QueryRecord) -> Vec<Option<String>> {
  let mut row = Vec::with_capacity(FIELDS.len() + 2);
  row.push(Some(record.query_id.clone()));
  row.extend(FIELDS.iter().map(|f| f.read(&record.fields).to_cell()));
  row.push(Some(record.status.to_string()));
  row
}

/// Encode `records` as CSV in [`export_columns`] order.
pub fn write_csv(records: &[QueryRecord]) -> Result<Vec<u8>> {
  let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
  writer.write_record(export_columns())?;

  for record in records {
    let row = export_row(record);
    writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or_default()))?;
  }

  writer.into_inner().map_err(|e| Error::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, Utc};
  use querydesk_core::query::{QueryFields, Status};

  use super::*;
  use crate::read_csv;

  fn record(query_id: &str, status: Status) -> QueryRecord {
    QueryRecord {
      id: 1,
      query_id: query_id.into(),
      fields: QueryFields {
        form: Some("mnh01".into()),
        notes: Some("line one, then \"two\"".into()),
        visit_date: NaiveDate::from_ymd_opt(2024, 2, 5),
        ..Default::default()
      },
      status,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  #[test]
  fn header_lists_import_columns_then_status() {
    let cols: Vec<_> = export_columns().collect();
    assert_eq!(cols.first(), Some(&"QueryID"));
    assert_eq!(cols.last(), Some(&"status"));
    assert_eq!(cols.len(), FIELDS.len() + 2);
  }

  #[test]
  fn export_reads_back_as_the_same_sheet() {
    let bytes = write_csv(&[record("Q1", Status::InProgress)]).unwrap();
    let t = read_csv(&bytes).unwrap();

    let col = |name: &str| t.column_index(name).unwrap();
    assert_eq!(t.cell(0, col("QueryID")), Some("Q1"));
    assert_eq!(t.cell(0, col("VisitDate")), Some("2024-02-05"));
    assert_eq!(t.cell(0, col("Notes")), Some("line one, then \"two\""));
    assert_eq!(t.cell(0, col("GHAID")), None);
    assert_eq!(t.cell(0, col("status")), Some("In Progress"));
  }

  #[test]
  fn empty_export_is_header_only() {
    let bytes = write_csv(&[]).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert_eq!(text.lines().count(), 1);
    assert!(text.starts_with("QueryID,GHAID,"));
  }

  #[test]
  fn format_defaults_to_xlsx_and_parses_names() {
    assert_eq!(ExportFormat::default(), ExportFormat::Xlsx);
    assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
    assert_eq!(ExportFormat::Xlsx.filename(), "exported_queries.xlsx");
    assert!(matches!("pdf".parse::<ExportFormat>(), Err(Error::UnsupportedFormat(_))));

    let bytes = ExportFormat::Xlsx.encode(&[record("Q1", Status::Pending)]).unwrap();
    assert!(bytes.starts_with(b"PK"));
  }
}
