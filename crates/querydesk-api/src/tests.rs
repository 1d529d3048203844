//! Router tests driving the API end to end over an in-memory store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use querydesk_core::{classify::FormClassification, fields::required_columns};
use querydesk_store_sqlite::{SqliteCatalog, SqliteStore};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::{ApiState, api_router};

type State = Arc<ApiState<SqliteStore, SqliteCatalog>>;

async fn make_state() -> State {
  let store = SqliteStore::open_in_memory().await.unwrap();
  store
    .execute_batch(
      "CREATE TABLE mnh01 (pregid TEXT, type_visit TEXT, sbp INTEGER);
       INSERT INTO mnh01 VALUES ('P001', 'ANC1', 120);",
    )
    .await
    .unwrap();
  let catalog = store.catalog();
  Arc::new(ApiState { store, catalog, forms: FormClassification::default() })
}

fn router(state: &State) -> Router { api_router(state.clone()) }

async fn oneshot_raw(
  state:  &State,
  method: &str,
  uri:    &str,
  ctype:  Option<&str>,
  body:   impl Into<Body>,
) -> axum::response::Response {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(ctype) = ctype {
    builder = builder.header(header::CONTENT_TYPE, ctype);
  }
  let req = builder.body(body.into()).unwrap();
  router(state).oneshot(req).await.unwrap()
}

async fn send_json(state: &State, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
  let resp = oneshot_raw(state, method, uri, Some("application/json"), body.to_string()).await;
  let status = resp.status();
  (status, read_json(resp).await)
}

async fn get_json(state: &State, uri: &str) -> (StatusCode, Value) {
  let resp = oneshot_raw(state, "GET", uri, None, Body::empty()).await;
  let status = resp.status();
  (status, read_json(resp).await)
}

async fn read_json(resp: axum::response::Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// A CSV sheet with every required column; unspecified cells are empty.
fn csv(rows: &[&[(&str, &str)]]) -> String {
  let headers: Vec<&str> = required_columns().collect();
  let mut out = headers.join(",");
  out.push('\n');
  for cells in rows {
    let line: Vec<&str> = headers
      .iter()
      .map(|h| cells.iter().find(|(k, _)| k == h).map_or("", |(_, v)| *v))
      .collect();
    out.push_str(&line.join(","));
    out.push('\n');
  }
  out
}

fn sample() -> String {
  csv(&[
    &[
      ("QueryID", "Q1"),
      ("PregID", "P001"),
      ("Form", "mnh01"),
      ("VisitType", "ANC1"),
      ("Variable_Name", "sbp"),
      ("Variable_Value", "120"),
      ("EditType", "Range"),
    ],
    &[("QueryID", "Q2"), ("PregID", "P002"), ("Form", "mnh00"), ("Notes", "call site")],
    &[("QueryID", "Q3"), ("VisitDate", "not a date")],
  ])
}

async fn seeded() -> State {
  let state = make_state().await;
  let resp = oneshot_raw(&state, "POST", "/upload", Some("text/csv"), sample()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  state
}

// ── Upload ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_reports_successes_and_row_errors() {
  let state = make_state().await;
  let resp = oneshot_raw(&state, "POST", "/upload?filename=q.csv", Some("text/csv"), sample()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = read_json(resp).await;
  assert_eq!(body["successCount"], 2);
  assert_eq!(body["errors"][0]["rowIndex"], 2);
  assert!(body.get("missingColumns").is_none());
}

#[tokio::test]
async fn upload_missing_columns_is_422() {
  let state = make_state().await;
  let resp = oneshot_raw(&state, "POST", "/upload", Some("text/csv"), "QueryID,Notes\nQ1,x\n").await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  let body = read_json(resp).await;
  assert_eq!(body["missingColumns"][0], "GHAID");
  assert_eq!(body["successCount"], 0);

  let (_, page) = get_json(&state, "/queries").await;
  assert_eq!(page["queries"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn upload_rejects_unknown_formats_and_empty_bodies() {
  let state = make_state().await;
  let resp = oneshot_raw(&state, "POST", "/upload?filename=q.pdf", None, "%PDF").await;
  assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

  let resp = oneshot_raw(&state, "POST", "/upload?filename=q.xlsx", None, "PK").await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = oneshot_raw(&state, "POST", "/upload", None, Body::empty()).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn latin1_row_fails_alone() {
  let state = make_state().await;
  let text = csv(&[&[("QueryID", "Q1")], &[("QueryID", "Q2"), ("Notes", "NOTE")], &[("QueryID", "Q3")]]);
  let (head, tail) = text.split_once("NOTE").unwrap();
  let body = [head.as_bytes(), b"caf\xe9", tail.as_bytes()].concat();

  let resp = oneshot_raw(&state, "POST", "/upload?filename=q.csv", Some("text/csv"), body).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let report = read_json(resp).await;
  assert_eq!(report["successCount"], 2);
  assert_eq!(report["errors"][0]["rowIndex"], 1);
  assert_eq!(report["errors"][0]["message"], "invalid UTF-8 in Notes");

  let (_, page) = get_json(&state, "/queries").await;
  let ids: Vec<&str> = page["queries"]
    .as_array()
    .unwrap()
    .iter()
    .map(|q| q["QueryID"].as_str().unwrap())
    .collect();
  assert_eq!(ids, vec!["Q1", "Q3"]);
}

#[tokio::test]
async fn workbook_export_uploads_into_a_fresh_store() {
  let state = seeded().await;
  let resp = oneshot_raw(&state, "GET", "/bulk/export?query_ids=1,2", None, Body::empty()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let workbook = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();

  let fresh = make_state().await;
  let resp = oneshot_raw(&fresh, "POST", "/upload?filename=Queries.XLSX", None, workbook).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let report = read_json(resp).await;
  assert_eq!(report["successCount"], 2);
  assert_eq!(report["errors"], json!([]));

  let (_, record) = get_json(&fresh, "/query/1").await;
  assert_eq!(record["QueryID"], "Q1");
  assert_eq!(record["Variable_Value"], "120");
}

// ── Listing ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_filters_and_paginates() {
  let state = seeded().await;

  let (status, page) = get_json(&state, "/queries").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(page["queries"].as_array().unwrap().len(), 2);
  assert_eq!(page["page"], 1);
  assert_eq!(page["pages"], 1);
  assert_eq!(page["has_next"], false);
  assert_eq!(page["queries"][0]["QueryID"], "Q1");
  assert_eq!(page["queries"][0]["status"], "Pending");

  let (_, page) = get_json(&state, "/queries?form=mnh00&edit_type=").await;
  assert_eq!(page["queries"].as_array().unwrap().len(), 1);

  let (_, page) = get_json(&state, "/queries?search=CALL").await;
  assert_eq!(page["queries"][0]["QueryID"], "Q2");

  let (_, page) = get_json(&state, "/queries?status=In%20Progress").await;
  assert_eq!(page["queries"].as_array().unwrap().len(), 0);

  let (status, body) = get_json(&state, "/queries?status=Open").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("Open"));
}

#[tokio::test]
async fn filter_options_list_distinct_values() {
  let state = seeded().await;
  let (status, body) = get_json(&state, "/queries/filters").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["forms"], json!(["mnh00", "mnh01"]));
  assert_eq!(body["edit_types"], json!(["Range"]));
  assert_eq!(body["statuses"], json!(["Pending", "In Progress", "Resolved", "Closed"]));
}

// ── Single record ────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_and_update_one() {
  let state = seeded().await;

  let (status, _) = get_json(&state, "/query/99").await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, record) = send_json(
    &state,
    "PUT",
    "/query/2",
    json!({ "Notes": "resolved on call", "status": "Resolved" }),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(record["Notes"], "resolved on call");
  assert_eq!(record["status"], "Resolved");
  assert_eq!(record["Form"], "mnh00");

  let (status, _) = send_json(&state, "PUT", "/query/2", json!({ "status": "Open" })).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

  let (status, _) = send_json(&state, "PUT", "/query/99", json!({ "Notes": "x" })).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn compare_reads_the_source_form() {
  let state = seeded().await;

  let (status, body) = get_json(&state, "/query/1/compare").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["comparison_result"], "MATCH");
  assert_eq!(body["current_value"], "120");
  assert_eq!(
    body["query_used"],
    "SELECT sbp FROM mnh01 WHERE pregid = 'P001' AND type_visit = 'ANC1' LIMIT 1"
  );

  let (_, body) = get_json(&state, "/query/2/compare").await;
  assert_eq!(body["comparison_result"], "INCOMPLETE");
}

// ── Bulk ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn bulk_status_and_edit() {
  let state = seeded().await;

  let (status, _) = send_json(&state, "PUT", "/bulk/status", json!({ "status": "Closed" })).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) =
    send_json(&state, "PUT", "/bulk/status", json!({ "query_ids": [1, 2], "status": "Closed" }))
      .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["success"], true);
  assert_eq!(body["count"], 2);

  let (status, _) =
    send_json(&state, "PUT", "/bulk/edit", json!({ "query_ids": [1], "updates": {} })).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = send_json(
    &state,
    "PUT",
    "/bulk/edit",
    json!({ "query_ids": [1, 2], "updates": { "RemoveEdit": "Yes" } }),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["count"], 2);

  let (_, record) = get_json(&state, "/query/1").await;
  assert_eq!(record["RemoveEdit"], "Yes");
  assert_eq!(record["status"], "Closed");
}

#[tokio::test]
async fn bulk_delete_removes_records() {
  let state = seeded().await;

  let (status, _) = send_json(&state, "DELETE", "/bulk/delete", json!({ "query_ids": [] })).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) =
    send_json(&state, "DELETE", "/bulk/delete", json!({ "query_ids": [1, 42] })).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["count"], 1);

  let (status, _) = get_json(&state, "/query/1").await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bulk_export_defaults_to_a_workbook() {
  let state = seeded().await;

  let resp = oneshot_raw(&state, "GET", "/bulk/export", None, Body::empty()).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = oneshot_raw(&state, "GET", "/bulk/export?query_ids=2,1", None, Body::empty()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_owned();
  assert!(disposition.contains("exported_queries.xlsx"), "{disposition}");

  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let table = querydesk_sheet::read_workbook(&bytes).unwrap();
  assert_eq!(table.rows.len(), 2);
  assert_eq!(table.cell(0, 0), Some("Q1"));
}

#[tokio::test]
async fn bulk_export_as_csv_attachment() {
  let state = seeded().await;

  let resp =
    oneshot_raw(&state, "GET", "/bulk/export?query_ids=2,1&format=csv", None, Body::empty()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_owned();
  assert!(disposition.contains("exported_queries.csv"), "{disposition}");

  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let table = querydesk_sheet::read_csv(&bytes).unwrap();
  assert_eq!(table.rows.len(), 2);
  assert_eq!(table.cell(0, 0), Some("Q1"));
  let status_col = table.column_index("status").unwrap();
  assert_eq!(table.cell(1, status_col), Some("Pending"));
}
