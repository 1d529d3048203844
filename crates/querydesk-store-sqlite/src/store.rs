//! [`SqliteStore`], the SQLite implementation of [`QueryStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use querydesk_core::{
  fields::FIELDS,
  import::{self, ImportPlan, ImportReport},
  query::{FilterOptions, QueryFields, QueryFilter, QueryPage, QueryPatch, QueryRecord, Status},
  store::{QueryStore, QueryWriter},
};
use rusqlite::{OptionalExtension as _, types::Value};
use tracing::{debug, info};

use crate::{
  Result, SqliteCatalog,
  encode::{
    RawQuery, encode_dt, encode_status, field_columns, field_values, select_columns,
    text_or_null,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A querydesk store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path.as_ref()).await?;
    let store = Self { conn };
    store.init_schema().await?;
    info!(path = %path.as_ref().display(), "opened query store");
    Ok(store)
  }

  /// Open an in-memory store. Useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// A catalog over this store's own database, for deployments that keep the
  /// source forms next to the query table.
  pub fn catalog(&self) -> SqliteCatalog { SqliteCatalog::from_connection(self.conn.clone()) }

  /// Run arbitrary SQL against the store's connection. Used to seed source
  /// forms in tests and tooling.
  pub async fn execute_batch(&self, sql: impl Into<String>) -> Result<()> {
    let sql = sql.into();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn init_schema(&self) -> Result<()> { self.execute_batch(SCHEMA).await }

  /// Select full records matching `where_clause` (which may be empty).
  async fn select_records(&self, where_clause: String, params: Vec<Value>) -> Result<Vec<QueryRecord>> {
    let raws: Vec<RawQuery> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM queries {where_clause}", select_columns());
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawQuery::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawQuery::into_record).collect()
  }

  /// Run a single `UPDATE`/`DELETE` and return the affected row count.
  async fn execute(&self, sql: String, params: Vec<Value>) -> Result<usize> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(&sql, rusqlite::params_from_iter(params))?))
      .await?;
    Ok(changed)
  }
}

// ─── SQL helpers ─────────────────────────────────────────────────────────────

/// `?start, ?start+1, …` for `n` placeholders.
fn placeholders(start: usize, n: usize) -> String {
  (start..start + n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}

/// Membership test against a single bound JSON array, so a selection of any
/// size uses one SQL variable.
fn id_in(param: usize) -> String { format!("id IN (SELECT value FROM json_each(?{param}))") }

fn id_list(ids: &[i64]) -> Value {
  let joined = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
  Value::Text(format!("[{joined}]"))
}

/// `%text%` with `%`, `_` and `\` taken literally under `ESCAPE '\'`.
fn like_pattern(text: &str) -> String {
  let mut pattern = String::with_capacity(text.len() + 2);
  pattern.push('%');
  for c in text.chars() {
    if matches!(c, '%' | '_' | '\\') {
      pattern.push('\\');
    }
    pattern.push(c);
  }
  pattern.push('%');
  pattern
}

/// `SET` assignments for a reviewer patch, always including `updated_at`.
fn patch_assignments(patch: &QueryPatch, now: DateTime<Utc>) -> (Vec<String>, Vec<Value>) {
  let mut sets = Vec::new();
  let mut values = Vec::new();
  let mut push = |column: &str, value: Value| {
    values.push(value);
    sets.push(format!("{column} = ?{}", values.len()));
  };

  if let Some(notes) = &patch.notes {
    push("notes", text_or_null(notes));
  }
  if let Some(status) = patch.status {
    push("status", Value::Text(encode_status(status).to_owned()));
  }
  if let Some(remove_edit) = &patch.remove_edit {
    push("remove_edit", text_or_null(remove_edit));
  }
  push("updated_at", Value::Text(encode_dt(now)));

  (sets, values)
}

fn distinct(conn: &rusqlite::Connection, column: &str) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT DISTINCT {column} FROM queries
     WHERE {column} IS NOT NULL AND TRIM({column}) != ''
     ORDER BY {column}"
  ))?;
  let values = stmt
    .query_map([], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(values)
}

// ─── In-transaction writer ───────────────────────────────────────────────────

/// [`QueryWriter`] over an open transaction.
struct TxWriter<'a> {
  conn: &'a rusqlite::Connection,
}

impl QueryWriter for TxWriter<'_> {
  type Error = rusqlite::Error;

  fn find_id_by_query_id(&mut self, query_id: &str) -> rusqlite::Result<Option<i64>> {
    self
      .conn
      .prepare_cached("SELECT id FROM queries WHERE query_id = ?1")?
      .query_row([query_id], |row| row.get(0))
      .optional()
  }

  fn insert(
    &mut self,
    query_id: &str,
    fields: &QueryFields,
    status: Status,
    now: DateTime<Utc>,
  ) -> rusqlite::Result<i64> {
    let sql = format!(
      "INSERT INTO queries (query_id, {}, status, created_at, updated_at) VALUES ({})",
      field_columns(),
      placeholders(1, FIELDS.len() + 4),
    );

    let mut values = vec![Value::Text(query_id.to_owned())];
    values.extend(field_values(fields));
    values.push(Value::Text(encode_status(status).to_owned()));
    values.push(Value::Text(encode_dt(now)));
    values.push(Value::Text(encode_dt(now)));

    self
      .conn
      .prepare_cached(&sql)?
      .execute(rusqlite::params_from_iter(values))?;
    Ok(self.conn.last_insert_rowid())
  }

  fn update(&mut self, id: i64, fields: &QueryFields, now: DateTime<Utc>) -> rusqlite::Result<()> {
    let n = FIELDS.len();
    let sets = FIELDS
      .iter()
      .enumerate()
      .map(|(i, f)| format!("{} = ?{}", f.sql_column, i + 1))
      .collect::<Vec<_>>()
      .join(", ");
    let sql = format!(
      "UPDATE queries SET {sets}, updated_at = ?{} WHERE id = ?{}",
      n + 1,
      n + 2
    );

    let mut values = field_values(fields);
    values.push(Value::Text(encode_dt(now)));
    values.push(Value::Integer(id));

    self
      .conn
      .prepare_cached(&sql)?
      .execute(rusqlite::params_from_iter(values))?;
    Ok(())
  }

  fn is_row_scoped(err: &rusqlite::Error) -> bool {
    matches!(
      err,
      rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
  }
}

// ─── QueryStore impl ─────────────────────────────────────────────────────────

impl QueryStore for SqliteStore {
  type Error = crate::Error;

  async fn import_batch(&self, plan: ImportPlan) -> Result<ImportReport> {
    let now = Utc::now();
    let staged = plan.rows.len();

    let report = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let report = import::apply(&mut TxWriter { conn: &tx }, plan, now)?;
        tx.commit()?;
        Ok(report)
      })
      .await?;

    info!(
      staged,
      imported = report.success_count,
      errors = report.errors.len(),
      "import committed"
    );
    Ok(report)
  }

  async fn get_query(&self, id: i64) -> Result<Option<QueryRecord>> {
    let mut found = self
      .select_records("WHERE id = ?1".to_owned(), vec![Value::Integer(id)])
      .await?;
    Ok(found.pop())
  }

  async fn list_queries(&self, filter: &QueryFilter) -> Result<QueryPage> {
    let mut conds: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    let mut push_eq = |column: &str, value: Option<String>| {
      if let Some(v) = value {
        values.push(Value::Text(v));
        conds.push(format!("{column} = ?{}", values.len()));
      }
    };

    push_eq("edit_type", filter.edit_type.clone());
    push_eq("visit_type", filter.visit_type.clone());
    push_eq("form", filter.form.clone());
    push_eq("status", filter.status.map(|s| encode_status(s).to_owned()));

    if let Some(search) = &filter.search {
      values.push(Value::Text(like_pattern(search)));
      let p = values.len();
      let matches = ["query_id", "preg_id", "notes", "ghaid"]
        .map(|column| format!("{column} LIKE ?{p} ESCAPE '\\'"))
        .join(" OR ");
      conds.push(format!("({matches})"));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    let page = filter.page.max(1);
    let per_page = filter.per_page.max(1);
    let offset = i64::from(page - 1) * i64::from(per_page);

    let count_sql = format!("SELECT COUNT(*) FROM queries {where_clause}");
    let count_params = values.clone();
    let total: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&count_sql, rusqlite::params_from_iter(count_params), |row| {
          row.get(0)
        })?)
      })
      .await?;

    let mut page_values = values;
    page_values.push(Value::Integer(i64::from(per_page)));
    page_values.push(Value::Integer(offset));
    let n = page_values.len();
    let queries = self
      .select_records(
        format!("{where_clause} ORDER BY id LIMIT ?{} OFFSET ?{n}", n - 1),
        page_values,
      )
      .await?;

    debug!(total, page, returned = queries.len(), "listed queries");
    Ok(QueryPage::new(queries, page, per_page, u64::try_from(total).unwrap_or_default()))
  }

  async fn filter_options(&self) -> Result<FilterOptions> {
    let (edit_types, visit_types, forms) = self
      .conn
      .call(|conn| {
        Ok((
          distinct(conn, "edit_type")?,
          distinct(conn, "visit_type")?,
          distinct(conn, "form")?,
        ))
      })
      .await?;

    Ok(FilterOptions {
      edit_types,
      visit_types,
      forms,
      statuses: Status::ALL.to_vec(),
    })
  }

  async fn update_query(&self, id: i64, patch: QueryPatch) -> Result<Option<QueryRecord>> {
    let (sets, mut values) = patch_assignments(&patch, Utc::now());
    values.push(Value::Integer(id));
    let sql = format!("UPDATE queries SET {} WHERE id = ?{}", sets.join(", "), values.len());

    if self.execute(sql, values).await? == 0 {
      return Ok(None);
    }
    self.get_query(id).await
  }

  async fn bulk_update_status(&self, ids: Vec<i64>, status: Status) -> Result<usize> {
    let patch = QueryPatch { status: Some(status), ..Default::default() };
    self.bulk_edit(ids, patch).await
  }

  async fn bulk_edit(&self, ids: Vec<i64>, patch: QueryPatch) -> Result<usize> {
    if ids.is_empty() {
      return Ok(0);
    }
    let (sets, mut values) = patch_assignments(&patch, Utc::now());
    let sql = format!("UPDATE queries SET {} WHERE {}", sets.join(", "), id_in(values.len() + 1));
    values.push(id_list(&ids));

    let changed = self.execute(sql, values).await?;
    info!(requested = ids.len(), changed, "bulk edit applied");
    Ok(changed)
  }

  async fn bulk_delete(&self, ids: Vec<i64>) -> Result<usize> {
    if ids.is_empty() {
      return Ok(0);
    }
    let sql = format!("DELETE FROM queries WHERE {}", id_in(1));
    let deleted = self.execute(sql, vec![id_list(&ids)]).await?;
    info!(requested = ids.len(), deleted, "bulk delete applied");
    Ok(deleted)
  }

  async fn get_queries_by_ids(&self, ids: Vec<i64>) -> Result<Vec<QueryRecord>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let where_clause = format!("WHERE {} ORDER BY id", id_in(1));
    self.select_records(where_clause, vec![id_list(&ids)]).await
  }
}
