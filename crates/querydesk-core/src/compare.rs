//! Classifying a stored query value against the live source value.

use serde::{Deserialize, Serialize};

use crate::{
  classify::FormClassification,
  query::{QueryRecord, non_blank},
  resolve::{CurrentValue, resolve_current_value},
  store::SourceCatalog,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
  Match,
  Mismatch,
  NotFound,
  /// The record lacks the form, subject id or variable name needed to look
  /// anything up.
  Incomplete,
}

/// Compare a stored value against a resolved one as text.
///
/// Case-sensitive, no coercion. A stored value of `None` compares as the
/// empty string.
pub fn compare(stored: Option<&str>, current: &CurrentValue) -> Outcome {
  match current {
    CurrentValue::NotFound => Outcome::NotFound,
    CurrentValue::Found(v) if stored.unwrap_or_default() == v => Outcome::Match,
    CurrentValue::Found(_) => Outcome::Mismatch,
  }
}

/// What a reviewer sees for a comparison request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
  pub query_value:       Option<String>,
  pub current_value:     Option<String>,
  pub comparison_result: Outcome,
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub error_message:     Option<String>,
  pub query_used:        String,
}

/// Resolve and classify `record`'s current source value.
///
/// A record missing any of `Form`, `PregID` or `Variable_Name` is
/// [`Outcome::Incomplete`] and the catalog is never consulted.
pub async fn compare_record<C: SourceCatalog>(
  catalog: &C,
  forms: &FormClassification,
  record: &QueryRecord,
) -> ComparisonResult {
  let f = &record.fields;
  let query_value = f.variable_value.clone();

  let (Some(form), Some(subject_id), Some(variable)) = (
    non_blank(f.form.as_deref()),
    non_blank(f.preg_id.as_deref()),
    non_blank(f.variable_name.as_deref()),
  ) else {
    let missing: Vec<&str> = [("Form", &f.form), ("PregID", &f.preg_id), ("Variable_Name", &f.variable_name)]
      .into_iter()
      .filter(|(_, v)| non_blank(v.as_deref()).is_none())
      .map(|(name, _)| name)
      .collect();
    return ComparisonResult {
      query_value,
      current_value: None,
      comparison_result: Outcome::Incomplete,
      error_message: Some(format!("missing {}", missing.join(", "))),
      query_used: String::new(),
    };
  };

  let resolution = resolve_current_value(
    catalog,
    forms,
    form,
    f.visit_type.as_deref(),
    subject_id,
    variable,
  )
  .await;

  let comparison_result = compare(query_value.as_deref(), &resolution.value);
  let error_message = (comparison_result == Outcome::NotFound)
    .then(|| format!("no current value found for {form}.{variable}"));

  ComparisonResult {
    query_value,
    current_value: resolution.value.as_found().map(str::to_owned),
    comparison_result,
    error_message,
    query_used: resolution.query_used,
  }
}
