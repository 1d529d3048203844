//! Which predicate a form's rows are matched by.
//!
//! Some source forms hold one row per subject; others hold one row per subject
//! per visit and must also be filtered on visit type to avoid reading the
//! wrong row. The partition is configuration: the resolver and the
//! diagnostic query text both consult this one table.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Result, ident::Identifier};

/// The predicate shape used to locate a subject's row in a source form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKey {
  /// `subject = ?`
  Subject,
  /// `subject = ? AND visit = ?`
  SubjectAndVisit,
}

/// Static partition of known forms plus the linkage column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormClassification {
  /// Subject-identifier column present in every source form.
  pub subject_column:     String,
  /// Visit-type column present in repeated-measure forms.
  pub visit_column:       String,
  /// Forms with one row per subject per visit.
  pub visit_type_forms:   BTreeSet<String>,
  /// Forms with one row per subject. Listed for documentation; any form
  /// absent from both sets is treated the same way.
  pub subject_only_forms: BTreeSet<String>,
}

const DEFAULT_VISIT_TYPE_FORMS: &[&str] = &[
  "mnh01", "mnh04", "mnh05", "mnh06", "mnh07", "mnh08", "mnh12", "mnh13", "mnh14", "mnh15",
  "mnh25", "mnh26",
];

const DEFAULT_SUBJECT_ONLY_FORMS: &[&str] = &[
  "mnh00", "mnh02", "mnh03", "mnh09", "mnh10", "mnh11", "mnh16", "mnh17", "mnh18", "mnh19",
  "mnh20", "mnh21", "mnh23", "mnh24",
];

impl Default for FormClassification {
  fn default() -> Self {
    Self {
      subject_column:     "pregid".to_owned(),
      visit_column:       "type_visit".to_owned(),
      visit_type_forms:   DEFAULT_VISIT_TYPE_FORMS.iter().map(|s| (*s).to_owned()).collect(),
      subject_only_forms: DEFAULT_SUBJECT_ONLY_FORMS.iter().map(|s| (*s).to_owned()).collect(),
    }
  }
}

impl FormClassification {
  /// Classify a form name. Comparison is case-insensitive.
  pub fn match_key(&self, form: &str) -> MatchKey {
    let form = form.to_ascii_lowercase();
    if self.visit_type_forms.contains(&form) {
      MatchKey::SubjectAndVisit
    } else {
      MatchKey::Subject
    }
  }

  pub fn subject_column(&self) -> Result<Identifier> {
    Identifier::parse(&self.subject_column).map(|i| i.to_lowercase())
  }

  pub fn visit_column(&self) -> Result<Identifier> {
    Identifier::parse(&self.visit_column).map(|i| i.to_lowercase())
  }

  /// Check the configured column names before serving with them.
  pub fn validate(&self) -> Result<()> {
    self.subject_column()?;
    self.visit_column()?;
    Ok(())
  }
}
