//! Query records, one per data-quality flag raised by the upstream process.
//!
//! A record is keyed externally by its `QueryID` and internally by a surrogate
//! integer `id`. Field names on the wire match the spreadsheet headers the
//! records are imported from.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Reviewer workflow state. Imports never change it on an existing record.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
pub enum Status {
  #[default]
  Pending,
  #[serde(rename = "In Progress")]
  #[strum(serialize = "In Progress")]
  InProgress,
  Resolved,
  Closed,
}

impl Status {
  pub const ALL: [Status; 4] =
    [Status::Pending, Status::InProgress, Status::Resolved, Status::Closed];
}

// ─── Fields ──────────────────────────────────────────────────────────────────

/// Every imported field except the `QueryID` key.
///
/// Absent cells are `None`, never the empty string. The import engine and the
/// storage layer both go through [`crate::fields::FIELDS`] to read and write
/// these, so adding a column means adding it here and there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFields {
  #[serde(rename = "GHAID")]
  pub ghaid:              Option<String>,
  #[serde(rename = "ScrnID")]
  pub scrn_id:            Option<String>,
  #[serde(rename = "MomID")]
  pub mom_id:             Option<String>,
  #[serde(rename = "PregID")]
  pub preg_id:            Option<String>,
  #[serde(rename = "InfantID")]
  pub infant_id:          Option<String>,
  #[serde(rename = "VisitType")]
  pub visit_type:         Option<String>,
  #[serde(rename = "VisitDate")]
  pub visit_date:         Option<NaiveDate>,
  #[serde(rename = "Form")]
  pub form:               Option<String>,
  #[serde(rename = "Variable_Name")]
  pub variable_name:      Option<String>,
  #[serde(rename = "Variable_Value")]
  pub variable_value:     Option<String>,
  #[serde(rename = "EditType")]
  pub edit_type:          Option<String>,
  #[serde(rename = "UploadDate")]
  pub upload_date:        Option<NaiveDate>,
  #[serde(rename = "FieldType")]
  pub field_type:         Option<String>,
  #[serde(rename = "DateEditReported")]
  pub date_edit_reported: Option<NaiveDate>,
  #[serde(rename = "Form_Edit_Type")]
  pub form_edit_type:     Option<String>,
  #[serde(rename = "VarFormEdit")]
  pub var_form_edit:      Option<String>,
  #[serde(rename = "RemoveEdit")]
  pub remove_edit:        Option<String>,
  #[serde(rename = "Notes")]
  pub notes:              Option<String>,
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A persisted query record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
  pub id:         i64,
  #[serde(rename = "QueryID")]
  pub query_id:   String,
  #[serde(flatten)]
  pub fields:     QueryFields,
  pub status:     Status,
  #[serde(with = "timestamp")]
  pub created_at: DateTime<Utc>,
  #[serde(with = "timestamp")]
  pub updated_at: DateTime<Utc>,
}

/// Reviewer edits applied to one record or to a selection of records.
///
/// `None` leaves a field untouched; a blank string clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPatch {
  #[serde(rename = "Notes", default)]
  pub notes:       Option<String>,
  #[serde(default)]
  pub status:      Option<Status>,
  #[serde(rename = "RemoveEdit", default)]
  pub remove_edit: Option<String>,
}

impl QueryPatch {
  pub fn is_empty(&self) -> bool {
    self.notes.is_none() && self.status.is_none() && self.remove_edit.is_none()
  }
}

/// Map a blank or whitespace-only cell to `None`.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
  value.filter(|v| !v.trim().is_empty())
}

// ─── Listing ─────────────────────────────────────────────────────────────────

/// Default page size for [`QueryFilter`].
pub const PER_PAGE: u32 = 20;

/// Parameters for [`crate::store::QueryStore::list_queries`].
#[derive(Debug, Clone)]
pub struct QueryFilter {
  pub edit_type:  Option<String>,
  pub visit_type: Option<String>,
  pub form:       Option<String>,
  pub status:     Option<Status>,
  /// Case-insensitive substring over `QueryID`, `PregID`, `Notes`, `GHAID`.
  pub search:     Option<String>,
  /// 1-based page number.
  pub page:       u32,
  pub per_page:   u32,
}

impl Default for QueryFilter {
  fn default() -> Self {
    Self {
      edit_type:  None,
      visit_type: None,
      form:       None,
      status:     None,
      search:     None,
      page:       1,
      per_page:   PER_PAGE,
    }
  }
}

/// One page of [`QueryRecord`]s plus navigation metadata.
#[derive(Debug, Clone, Serialize)]
pub struct QueryPage {
  pub queries:  Vec<QueryRecord>,
  pub page:     u32,
  pub pages:    u32,
  pub total:    u64,
  pub has_next: bool,
  pub has_prev: bool,
}

impl QueryPage {
  pub fn new(queries: Vec<QueryRecord>, page: u32, per_page: u32, total: u64) -> Self {
    let per_page = u64::from(per_page.max(1));
    let pages = u32::try_from(total.div_ceil(per_page)).unwrap_or(u32::MAX);
    Self {
      queries,
      page,
      pages,
      total,
      has_next: page < pages,
      has_prev: page > 1,
    }
  }
}

/// Distinct values reviewers can filter the list by.
#[derive(Debug, Clone, Serialize)]
pub struct FilterOptions {
  pub edit_types:  Vec<String>,
  pub visit_types: Vec<String>,
  pub forms:       Vec<String>,
  pub statuses:    Vec<Status>,
}

// ─── Serde helpers ───────────────────────────────────────────────────────────

/// `YYYY-MM-DD HH:MM:SS` in UTC, the format reviewers see in the list view.
mod timestamp {
  use chrono::{DateTime, NaiveDateTime, Utc};
  use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

  const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

  pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&dt.format(FORMAT))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(d)?;
    NaiveDateTime::parse_from_str(&raw, FORMAT)
      .map(|naive| naive.and_utc())
      .map_err(D::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use chrono::TimeZone;

  use super::*;

  #[test]
  fn status_string_forms() {
    assert_eq!(Status::InProgress.to_string(), "In Progress");
    assert_eq!(Status::from_str("Resolved").unwrap(), Status::Resolved);
    assert!(Status::from_str("Done").is_err());
    assert_eq!(
      serde_json::to_string(&Status::InProgress).unwrap(),
      "\"In Progress\""
    );
    assert!(serde_json::from_str::<Status>("\"Archived\"").is_err());
  }

  #[test]
  fn record_serialises_with_sheet_field_names() {
    let at = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
    let record = QueryRecord {
      id:         7,
      query_id:   "Q-1".into(),
      fields:     QueryFields {
        preg_id: Some("P001".into()),
        visit_date: NaiveDate::from_ymd_opt(2025, 1, 31),
        ..Default::default()
      },
      status:     Status::Pending,
      created_at: at,
      updated_at: at,
    };

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["QueryID"], "Q-1");
    assert_eq!(json["PregID"], "P001");
    assert_eq!(json["VisitDate"], "2025-01-31");
    assert_eq!(json["GHAID"], serde_json::Value::Null);
    assert_eq!(json["created_at"], "2025-03-04 05:06:07");

    let back: QueryRecord = serde_json::from_value(json).unwrap();
    assert_eq!(back, record);
  }

  #[test]
  fn page_metadata() {
    let page = QueryPage::new(vec![], 1, 20, 41);
    assert_eq!(page.pages, 3);
    assert!(page.has_next);
    assert!(!page.has_prev);

    let empty = QueryPage::new(vec![], 1, 20, 0);
    assert_eq!(empty.pages, 0);
    assert!(!empty.has_next);
  }

  #[test]
  fn patch_accepts_partial_json() {
    let patch: QueryPatch =
      serde_json::from_str(r#"{"status":"Closed","Notes":"checked"}"#).unwrap();
    assert_eq!(patch.status, Some(Status::Closed));
    assert_eq!(patch.notes.as_deref(), Some("checked"));
    assert!(patch.remove_edit.is_none());
    assert!(QueryPatch::default().is_empty());
  }
}
