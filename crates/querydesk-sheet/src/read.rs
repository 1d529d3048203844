use querydesk_core::table::Table;
use tracing::{debug, warn};

use crate::{Error, Result, workbook::read_workbook};

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode an uploaded sheet, choosing the codec by file extension.
///
/// `.csv` goes through [`read_csv`]; Excel and OpenDocument workbooks through
/// [`read_workbook`]. Anything else is [`Error::UnsupportedFormat`].
pub fn read_upload(filename: &str, bytes: &[u8]) -> Result<Table> {
  let ext = filename
    .rsplit_once('.')
    .map(|(_, ext)| ext.to_ascii_lowercase())
    .unwrap_or_default();
  match ext.as_str() {
    "csv" => read_csv(bytes),
    "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(bytes),
    _ => Err(Error::UnsupportedFormat(filename.to_owned())),
  }
}

/// Decode CSV bytes with a header row.
///
/// Headers are trimmed. Short rows are padded with empty cells, surplus cells
/// are dropped, and blank cells read as `None`. A row with a cell that is not
/// valid UTF-8 is kept as a rejected row rather than failing the sheet.
pub fn read_csv(bytes: &[u8]) -> Result<Table> {
  let bytes = bytes.strip_prefix(BOM).unwrap_or(bytes);
  let mut reader = csv::ReaderBuilder::new()
    .has_headers(true)
    .flexible(true)
    .trim(csv::Trim::Headers)
    .from_reader(bytes);

  let headers: Vec<String> = reader
    .byte_headers()?
    .iter()
    .map(|h| String::from_utf8_lossy(h).into_owned())
    .collect();
  if headers.iter().all(|h| h.is_empty()) {
    return Err(Error::MissingHeader);
  }

  let mut table = Table::new(headers);
  for record in reader.byte_records() {
    let record = record?;
    match decode_row(&record, &table.headers) {
      Ok(row) => table.push_row(row),
      Err(message) => {
        warn!(row_index = table.rows.len(), %message, "rejecting CSV row");
        table.push_rejected(message);
      }
    }
  }

  debug!(
    columns = table.headers.len(),
    rows = table.rows.len(),
    rejected = table.rejected.len(),
    "decoded CSV sheet"
  );
  Ok(table)
}

fn decode_row(
  record: &csv::ByteRecord,
  headers: &[String],
) -> std::result::Result<Vec<Option<String>>, String> {
  headers
    .iter()
    .enumerate()
    .map(|(i, header)| {
      let Some(raw) = record.get(i) else { return Ok(None) };
      let cell = std::str::from_utf8(raw).map_err(|_| format!("invalid UTF-8 in {header}"))?;
      Ok((!cell.trim().is_empty()).then(|| cell.to_owned()))
    })
    .collect()
}
