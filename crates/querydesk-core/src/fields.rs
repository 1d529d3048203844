//! The declarative column table shared by import, storage and export.
//!
//! Each [`FieldSpec`] ties a spreadsheet header to a [`QueryFields`] member and
//! the SQL column that stores it. Create and update paths both walk [`FIELDS`]
//! so the null-passthrough rule is applied in exactly one place.

use chrono::{NaiveDate, NaiveDateTime};

use crate::{
  Error, Result,
  query::{QueryFields, non_blank},
};

/// The natural key column. Not part of [`FIELDS`]; it is never overwritten.
pub const QUERY_ID: &str = "QueryID";

/// How a field's cells are interpreted.
#[derive(Clone, Copy)]
pub enum Slot {
  Text {
    get: fn(&QueryFields) -> Option<&str>,
    set: fn(&mut QueryFields, Option<String>),
  },
  /// Date-only; any time component in the source cell is discarded.
  Date {
    get: fn(&QueryFields) -> Option<NaiveDate>,
    set: fn(&mut QueryFields, Option<NaiveDate>),
  },
}

pub struct FieldSpec {
  /// Spreadsheet header, also the JSON field name.
  pub column:     &'static str,
  /// Column name in the `queries` table.
  pub sql_column: &'static str,
  pub slot:       Slot,
}

/// A borrowed field value read through a [`FieldSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
  Text(Option<&'a str>),
  Date(Option<NaiveDate>),
}

impl FieldValue<'_> {
  /// Render as a cell; dates use `YYYY-MM-DD`.
  pub fn to_cell(self) -> Option<String> {
    match self {
      FieldValue::Text(v) => v.map(str::to_owned),
      FieldValue::Date(v) => v.map(|d| d.format("%Y-%m-%d").to_string()),
    }
  }
}

impl FieldSpec {
  pub fn read<'a>(&self, fields: &'a QueryFields) -> FieldValue<'a> {
    match self.slot {
      Slot::Text { get, .. } => FieldValue::Text(get(fields)),
      Slot::Date { get, .. } => FieldValue::Date(get(fields)),
    }
  }

  /// Write a raw cell into `fields`. Blank cells become `None`.
  pub fn assign(&self, fields: &mut QueryFields, cell: Option<&str>) -> Result<()> {
    let cell = non_blank(cell);
    match self.slot {
      Slot::Text { set, .. } => set(fields, cell.map(str::to_owned)),
      Slot::Date { set, .. } => {
        let date = cell
          .map(|raw| {
            parse_date(raw).ok_or_else(|| Error::InvalidDate {
              column: self.column.to_owned(),
              value:  raw.to_owned(),
            })
          })
          .transpose()?;
        set(fields, date);
      }
    }
    Ok(())
  }
}

macro_rules! field_table {
  (@slot text $field:ident) => {
    Slot::Text { get: |f| f.$field.as_deref(), set: |f, v| f.$field = v }
  };
  (@slot date $field:ident) => {
    Slot::Date { get: |f| f.$field, set: |f, v| f.$field = v }
  };
  ($( $column:literal => $kind:ident $field:ident ),+ $(,)?) => {
    /// Every imported field other than `QueryID`, in spreadsheet order.
    pub static FIELDS: &[FieldSpec] = &[
      $( FieldSpec {
        column:     $column,
        sql_column: stringify!($field),
        slot:       field_table!(@slot $kind $field),
      } ),+
    ];
  };
}

field_table! {
  "GHAID"            => text ghaid,
  "ScrnID"           => text scrn_id,
  "MomID"            => text mom_id,
  "PregID"           => text preg_id,
  "InfantID"         => text infant_id,
  "VisitType"        => text visit_type,
  "VisitDate"        => date visit_date,
  "Form"             => text form,
  "Variable_Name"    => text variable_name,
  "Variable_Value"   => text variable_value,
  "EditType"         => text edit_type,
  "UploadDate"       => date upload_date,
  "FieldType"        => text field_type,
  "DateEditReported" => date date_edit_reported,
  "Form_Edit_Type"   => text form_edit_type,
  "VarFormEdit"      => text var_form_edit,
  "RemoveEdit"       => text remove_edit,
  "Notes"            => text notes,
}

/// The full required header set: `QueryID` followed by [`FIELDS`].
pub fn required_columns() -> impl Iterator<Item = &'static str> {
  std::iter::once(QUERY_ID).chain(FIELDS.iter().map(|f| f.column))
}

// ─── Dates ───────────────────────────────────────────────────────────────────

const DATE_FORMATS: &[&str] =
  &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

const DATETIME_FORMATS: &[&str] = &[
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%dT%H:%M:%S%.f",
  "%d/%m/%Y %H:%M:%S",
  "%d/%m/%Y %H:%M",
];

/// Parse a spreadsheet date cell. Day-first when the order is ambiguous.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
  let raw = raw.trim();
  DATE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
    .or_else(|| {
      DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn spec(column: &str) -> &'static FieldSpec {
    FIELDS.iter().find(|f| f.column == column).unwrap()
  }

  #[test]
  fn required_columns_cover_the_sheet_layout() {
    let cols: Vec<_> = required_columns().collect();
    assert_eq!(cols.len(), 19);
    assert_eq!(cols[0], "QueryID");
    assert_eq!(cols[18], "Notes");
    assert!(cols.contains(&"Variable_Value"));
  }

  #[test]
  fn blank_cells_become_none() {
    let mut fields = QueryFields {
      notes: Some("old".into()),
      ..Default::default()
    };
    spec("Notes").assign(&mut fields, Some("   ")).unwrap();
    assert_eq!(fields.notes, None);

    spec("Notes").assign(&mut fields, None).unwrap();
    assert_eq!(fields.notes, None);
  }

  #[test]
  fn text_and_date_assignment() {
    let mut fields = QueryFields::default();
    spec("PregID").assign(&mut fields, Some("P001")).unwrap();
    spec("VisitDate").assign(&mut fields, Some("31/01/2025")).unwrap();

    assert_eq!(fields.preg_id.as_deref(), Some("P001"));
    assert_eq!(fields.visit_date, NaiveDate::from_ymd_opt(2025, 1, 31));
    assert_eq!(
      spec("VisitDate").read(&fields).to_cell().as_deref(),
      Some("2025-01-31")
    );
  }

  #[test]
  fn bad_date_names_the_column() {
    let mut fields = QueryFields::default();
    let err = spec("UploadDate")
      .assign(&mut fields, Some("not a date"))
      .unwrap_err();
    assert!(matches!(err, Error::InvalidDate { ref column, .. } if column == "UploadDate"));
  }

  #[test]
  fn date_formats() {
    let d = NaiveDate::from_ymd_opt(2024, 2, 5);
    assert_eq!(parse_date("2024-02-05"), d);
    assert_eq!(parse_date("2024/02/05"), d);
    assert_eq!(parse_date("05/02/2024"), d);
    assert_eq!(parse_date("05-02-2024"), d);
    assert_eq!(parse_date("05.02.2024"), d);
    assert_eq!(parse_date("2024-02-05 00:00:00"), d);
    assert_eq!(parse_date("2024-02-05T13:45:00"), d);
    assert_eq!(parse_date(" 2024-02-05 "), d);
    assert_eq!(parse_date("2024-02-30"), None);
    assert_eq!(parse_date("yesterday"), None);
  }
}
