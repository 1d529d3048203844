//! The current-value resolver.
//!
//! Given a form name, a visit type, a subject id and a variable name, work
//! out which source table, column and predicate to read, then read at most one
//! value. The resolver never fails: unsafe names, missing tables or columns,
//! and storage errors all come back as [`CurrentValue::NotFound`], with a
//! diagnostic `query_used` describing what was (or was not) attempted.

use tracing::{debug, error, warn};

use crate::{
  classify::{FormClassification, MatchKey},
  ident::Identifier,
  select::SelectOne,
  store::SourceCatalog,
};

/// The live value of a variable in its source form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentValue {
  Found(String),
  NotFound,
}

impl CurrentValue {
  pub fn as_found(&self) -> Option<&str> {
    match self {
      CurrentValue::Found(v) => Some(v),
      CurrentValue::NotFound => None,
    }
  }
}

/// A resolved value plus a description of the lookup behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
  pub value:      CurrentValue,
  pub query_used: String,
}

impl Resolution {
  fn not_found(query_used: impl Into<String>) -> Self {
    Self { value: CurrentValue::NotFound, query_used: query_used.into() }
  }
}

/// What the schema checks decided.
enum Plan {
  Select(SelectOne),
  Skip(String),
}

/// Resolve the current value of `variable` for `subject_id` in `form`.
///
/// Names that fail [`Identifier::parse`] short-circuit before any catalog
/// call. `visit_type` is only consulted for forms that
/// [`FormClassification`] marks as visit-dependent, and only if the table
/// actually has the visit column; otherwise the lookup matches on subject id
/// alone.
pub async fn resolve_current_value<C: SourceCatalog>(
  catalog: &C,
  forms: &FormClassification,
  form: &str,
  visit_type: Option<&str>,
  subject_id: &str,
  variable: &str,
) -> Resolution {
  let plan = match plan_lookup(catalog, forms, form, visit_type, subject_id, variable).await {
    Ok(plan) => plan,
    Err(e) => {
      error!(form, variable, error = %e, "schema lookup failed");
      return Resolution::not_found(format!("schema lookup failed for {form}.{variable}"));
    }
  };

  let select = match plan {
    Plan::Select(select) => select,
    Plan::Skip(reason) => {
      debug!(form, variable, %reason, "current value not resolvable");
      return Resolution::not_found(reason);
    }
  };

  let query_used = select.describe();
  match catalog.select_one(&select).await {
    Ok(Some(value)) => Resolution { value: CurrentValue::Found(value), query_used },
    Ok(None) => Resolution::not_found(query_used),
    Err(e) => {
      error!(query = %query_used, error = %e, "current value read failed");
      Resolution::not_found(query_used)
    }
  }
}

async fn plan_lookup<C: SourceCatalog>(
  catalog: &C,
  forms: &FormClassification,
  form: &str,
  visit_type: Option<&str>,
  subject_id: &str,
  variable: &str,
) -> Result<Plan, C::Error> {
  let (Ok(table), Ok(column)) = (Identifier::parse(form), Identifier::parse(variable)) else {
    warn!(form, variable, "rejected unsafe form or variable name");
    return Ok(Plan::Skip(format!("unsafe form or variable name: {form:?}, {variable:?}")));
  };
  let table = table.to_lowercase();
  let column = column.to_lowercase();

  let Ok(subject_col) = forms.subject_column() else {
    return Ok(Plan::Skip(format!("unsafe subject column: {:?}", forms.subject_column)));
  };

  if !catalog.table_exists(&table).await? {
    return Ok(Plan::Skip(format!("table {table} not found")));
  }
  if !catalog.column_exists(&table, &column).await? {
    return Ok(Plan::Skip(format!("column {column} not found in {table}")));
  }
  if !catalog.column_exists(&table, &subject_col).await? {
    return Ok(Plan::Skip(format!("column {subject_col} not found in {table}")));
  }

  let select =
    SelectOne::new(table.clone(), column).filter(subject_col, Some(subject_id.to_owned()));

  if forms.match_key(table.as_str()) == MatchKey::SubjectAndVisit {
    if let Ok(visit_col) = forms.visit_column()
      && catalog.column_exists(&table, &visit_col).await?
    {
      return Ok(Plan::Select(select.filter(visit_col, visit_type.map(str::to_owned))));
    }
    warn!(%table, "visit-type form has no visit column; matching on subject only");
  }

  Ok(Plan::Select(select))
}
