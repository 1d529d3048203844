//! [`SqliteCatalog`], the SQLite implementation of [`SourceCatalog`].
//!
//! Every call consults `sqlite_master` / `pragma_table_info` afresh, so a
//! source schema that changes between deploys is picked up without a restart.

use std::path::Path;

use querydesk_core::{ident::Identifier, select::SelectOne, store::SourceCatalog};
use rusqlite::{OpenFlags, OptionalExtension as _, types::Value};
use tracing::debug;

use crate::{Error, Result};

/// Read access to the source forms.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteCatalog {
  conn: tokio_rusqlite::Connection,
}

impl SqliteCatalog {
  /// Open a separate source database read-only.
  pub async fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_with_flags(
      path,
      OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI,
    )
    .await?;
    Ok(Self { conn })
  }

  pub(crate) fn from_connection(conn: tokio_rusqlite::Connection) -> Self { Self { conn } }

  async fn exists(&self, sql: &'static str, params: Vec<String>) -> Result<bool> {
    let found = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(sql, rusqlite::params_from_iter(params), |row| row.get::<_, bool>(0))?)
      })
      .await?;
    Ok(found)
  }
}

/// Render a cell the way it would read in a spreadsheet. `NULL` is absent.
fn cell_text(value: Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::Integer(i) => Some(i.to_string()),
    Value::Real(f) => Some(f.to_string()),
    Value::Text(s) => Some(s),
    Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
  }
}

impl SourceCatalog for SqliteCatalog {
  type Error = Error;

  async fn table_exists(&self, table: &Identifier) -> Result<bool> {
    self
      .exists(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1)",
        vec![table.as_str().to_owned()],
      )
      .await
  }

  async fn column_exists(&self, table: &Identifier, column: &Identifier) -> Result<bool> {
    self
      .exists(
        "SELECT EXISTS(SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2)",
        vec![table.as_str().to_owned(), column.as_str().to_owned()],
      )
      .await
  }

  async fn select_one(&self, query: &SelectOne) -> Result<Option<String>> {
    let sql = query.to_sql();
    let params: Vec<Option<String>> = query.params().map(|p| p.map(str::to_owned)).collect();
    debug!(%sql, "reading current value");

    let value: Option<Value> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params_from_iter(params), |row| row.get(0))
            .optional()?,
        )
      })
      .await?;

    Ok(value.and_then(cell_text))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cells_render_as_text() {
    assert_eq!(cell_text(Value::Null), None);
    assert_eq!(cell_text(Value::Integer(120)).as_deref(), Some("120"));
    assert_eq!(cell_text(Value::Real(120.0)).as_deref(), Some("120"));
    assert_eq!(cell_text(Value::Real(11.25)).as_deref(), Some("11.25"));
    assert_eq!(cell_text(Value::Text("ANC1".into())).as_deref(), Some("ANC1"));
  }
}
