//! [`SelectOne`]: the only shape of dynamic query the resolver can issue.
//!
//! Table and column names are [`Identifier`]s; predicate values are always
//! bound parameters.

use crate::ident::Identifier;

/// `SELECT <column> FROM <table> WHERE <a> = ?1 [AND <b> = ?2 ...] LIMIT 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOne {
  table:     Identifier,
  column:    Identifier,
  predicate: Vec<(Identifier, Option<String>)>,
}

impl SelectOne {
  pub fn new(table: Identifier, column: Identifier) -> Self {
    Self { table, column, predicate: Vec::new() }
  }

  /// Add an equality term. A `None` value binds SQL `NULL`, which matches no
  /// row.
  pub fn filter(mut self, column: Identifier, value: Option<String>) -> Self {
    self.predicate.push((column, value));
    self
  }

  pub fn table(&self) -> &Identifier { &self.table }

  pub fn column(&self) -> &Identifier { &self.column }

  /// Predicate columns in binding order.
  pub fn predicate_columns(&self) -> impl Iterator<Item = &Identifier> {
    self.predicate.iter().map(|(c, _)| c)
  }

  /// Parameterised SQL text.
  pub fn to_sql(&self) -> String {
    let mut sql = format!("SELECT {} FROM {}", self.column.quoted(), self.table.quoted());
    for (i, (column, _)) in self.predicate.iter().enumerate() {
      let joiner = if i == 0 { " WHERE" } else { " AND" };
      sql.push_str(&format!("{joiner} {} = ?{}", column.quoted(), i + 1));
    }
    sql.push_str(" LIMIT 1");
    sql
  }

  /// Bound values, in the same order as the `?N` placeholders.
  pub fn params(&self) -> impl Iterator<Item = Option<&str>> {
    self.predicate.iter().map(|(_, v)| v.as_deref())
  }

  /// Human-readable rendering with values inlined. Diagnostic only; never
  /// executed.
  pub fn describe(&self) -> String {
    let mut text = format!("SELECT {} FROM {}", self.column, self.table);
    for (i, (column, value)) in self.predicate.iter().enumerate() {
      let joiner = if i == 0 { " WHERE" } else { " AND" };
      let value = match value {
        Some(v) => format!("'{}'", v.replace('\'', "''")),
        None => "NULL".to_owned(),
      };
      text.push_str(&format!("{joiner} {column} = {value}"));
    }
    text.push_str(" LIMIT 1");
    text
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn id(s: &str) -> Identifier { Identifier::parse(s).unwrap() }

  #[test]
  fn renders_bound_placeholders() {
    let q = SelectOne::new(id("mnh01"), id("sbp"))
      .filter(id("pregid"), Some("P001".into()))
      .filter(id("type_visit"), Some("ANC1".into()));

    assert_eq!(
      q.to_sql(),
      r#"SELECT "sbp" FROM "mnh01" WHERE "pregid" = ?1 AND "type_visit" = ?2 LIMIT 1"#
    );
    assert_eq!(q.params().collect::<Vec<_>>(), vec![Some("P001"), Some("ANC1")]);
  }

  #[test]
  fn values_never_reach_sql_text() {
    let q = SelectOne::new(id("mnh00"), id("age"))
      .filter(id("pregid"), Some("x' OR '1'='1".into()));
    assert!(!q.to_sql().contains("OR"));
    assert_eq!(q.describe(), "SELECT age FROM mnh00 WHERE pregid = 'x'' OR ''1''=''1' LIMIT 1");
  }
}
