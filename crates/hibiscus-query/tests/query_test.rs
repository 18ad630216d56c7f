//! Integration tests for the query task against the in-memory store.

use futures::StreamExt;
use hibiscus_artifact::{FsStore, Store};
use hibiscus_datastore::{MemoryStore, Params, Row};
use hibiscus_query::{Query, QueryConfig, QueryError, Renderer};
use serde_json::json;

fn row(value: serde_json::Value) -> Row {
  value.as_object().expect("object row").clone()
}

fn config(statement: &str, fetch_mode: &str) -> QueryConfig {
  QueryConfig {
    connection_string: "memory://local".to_string(),
    username: "couchbase_user".to_string(),
    password: "couchbase_passwd".to_string(),
    statement: statement.to_string(),
    parameters: None,
    fetch_mode: fetch_mode.to_string(),
  }
}

fn sink() -> (tempfile::TempDir, FsStore) {
  let dir = tempfile::tempdir().expect("tempdir");
  let sink = FsStore::new(dir.path());
  (dir, sink)
}

#[tokio::test]
async fn fetch_one_returns_the_matching_document() {
  let store = MemoryStore::new();
  store.push_rows(vec![row(json!({"c_string": "Kestra Doc", "c_int": 3}))]);
  let (_dir, sink) = sink();

  let query = Query::new(config("SELECT * FROM bucket USE KEYS 'a-doc'", "FETCH_ONE"));
  let output = query
    .run(&Renderer::empty(), &store, &sink)
    .await
    .expect("run");

  assert_eq!(output.size, 1);
  let doc = output.row.expect("row populated");
  assert_eq!(doc["c_string"], "Kestra Doc");
  assert_eq!(doc["c_int"], 3);
}

#[tokio::test]
async fn fetch_one_with_no_matching_keys_is_absent_not_an_error() {
  let store = MemoryStore::new();
  let (_dir, sink) = sink();

  let query = Query::new(config("SELECT * FROM bucket USE KEYS 'a-doc'", "FETCH_ONE"));
  let output = query
    .run(&Renderer::empty(), &store, &sink)
    .await
    .expect("empty result is a normal outcome");

  assert_eq!(output.size, 0);
  assert!(output.row.is_none());
}

#[tokio::test]
async fn all_document_value_types_survive() {
  let store = MemoryStore::new();
  store.push_rows(vec![row(json!({
    "c_string": "Kestra Doc",
    "c_null": null,
    "c_boolean": true,
    "c_int": 3,
    "c_decimal": 3.10,
    "c_number_array": [3, 3.10, 3000],
    "c_string_array": ["firstString", "secondString"],
    "c_object": {"c_object_prop": "hello", "c_subobject": {"c_subobject_prop": 5}},
    "c_date": "2006-01-02T15:04:05.567+08:00",
  }))]);
  let (_dir, sink) = sink();

  let output = Query::new(config("SELECT * FROM bucket USE KEYS 'a-doc'", "FETCH_ONE"))
    .run(&Renderer::empty(), &store, &sink)
    .await
    .expect("run");

  let doc = output.row.expect("row populated");
  assert_eq!(doc["c_null"], json!(null));
  assert_eq!(doc["c_boolean"], true);
  assert_eq!(doc["c_decimal"], 3.10);
  assert_eq!(doc["c_number_array"], json!([3, 3.10, 3000]));
  assert_eq!(doc["c_string_array"], json!(["firstString", "secondString"]));
  assert_eq!(doc["c_object"]["c_subobject"]["c_subobject_prop"], 5);
  assert_eq!(doc["c_date"], "2006-01-02T15:04:05.567+08:00");

  // Field order is the store's order.
  let fields: Vec<_> = doc.keys().cloned().collect();
  assert_eq!(fields[0], "c_string");
  assert_eq!(fields[8], "c_date");
}

#[tokio::test]
async fn store_mode_round_trips_through_the_sink() {
  let store = MemoryStore::new();
  let rows = vec![
    row(json!({"c_string": "Kestra Doc", "c_int": 3})),
    row(json!({"c_string": "Another Kestra Doc", "c_int": 7})),
  ];
  store.push_rows(rows.clone());
  let (dir, sink) = sink();

  let output = Query::new(config("SELECT * FROM bucket", "STORE"))
    .run(&Renderer::empty(), &store, &sink)
    .await
    .expect("run");

  assert_eq!(output.size, 2);
  assert!(output.rows.is_none());
  assert!(output.row.is_none());

  // Read the blob back through the sink itself, so the contract holds
  // for any sink, not just one backed by the local filesystem.
  let uri = output.uri.expect("uri populated");
  let path = uri.strip_prefix("file://").expect("file uri");
  let key = std::path::Path::new(path)
    .strip_prefix(dir.path())
    .expect("key under sink base")
    .to_str()
    .expect("utf8 key")
    .to_string();

  let mut blob = Vec::new();
  let mut stream = sink.get(&key).await.expect("get blob");
  while let Some(chunk) = stream.next().await {
    blob.extend_from_slice(&chunk.expect("blob chunk"));
  }
  let body = String::from_utf8(blob).expect("utf8 blob");

  // One encoded record per row, store order, exact round-trip.
  let decoded: Vec<Row> = body
    .lines()
    .map(|line| serde_json::from_str(line).expect("decode record"))
    .collect();
  assert_eq!(decoded, rows);
  assert_eq!(decoded.len() as u64, output.size);
}

#[tokio::test]
async fn none_mode_reports_returning_clause_size_only() {
  let store = MemoryStore::new();
  store.push_rows(vec![row(json!({"c_string": "Another Kestra Doc"}))]);
  let (_dir, sink) = sink();

  let output = Query::new(config(
    "UPSERT INTO bucket (KEY, VALUE) VALUES ('another-doc', {\"c_string\": \"Another Kestra Doc\"}) RETURNING *",
    "NONE",
  ))
  .run(&Renderer::empty(), &store, &sink)
  .await
  .expect("run");

  assert_eq!(output.size, 1);
  assert!(output.rows.is_none());
  assert!(output.row.is_none());
  assert!(output.uri.is_none());
}

#[tokio::test]
async fn session_closes_exactly_once_when_execution_fails() {
  let store = MemoryStore::new();
  store.push_error("syntax error at SELEKT");
  let (_dir, sink) = sink();

  let err = Query::new(config("SELEKT * FROM bucket", "FETCH"))
    .run(&Renderer::empty(), &store, &sink)
    .await
    .err()
    .expect("should fail");

  assert!(matches!(err, QueryError::Execution { .. }));
  assert_eq!(store.connect_count(), 1);
  assert_eq!(store.close_count(), 1);
}

#[tokio::test]
async fn render_failure_happens_before_any_connection() {
  let store = MemoryStore::new();
  let (_dir, sink) = sink();

  let mut cfg = config("SELECT * FROM {{ bucket", "FETCH");
  cfg.statement = "SELECT * FROM {{ bucket".to_string();

  let err = Query::new(cfg)
    .run(&Renderer::empty(), &store, &sink)
    .await
    .err()
    .expect("should fail");

  assert!(matches!(err, QueryError::Render { .. }));
  assert_eq!(store.connect_count(), 0);
}

#[tokio::test]
async fn blank_credentials_after_rendering_are_rejected() {
  let store = MemoryStore::new();
  let (_dir, sink) = sink();

  let mut cfg = config("SELECT 1", "FETCH");
  cfg.username = "{{ user }}".to_string();

  // The variable renders to an empty string.
  let renderer = Renderer::new(&json!({"user": ""}));
  let err = Query::new(cfg)
    .run(&renderer, &store, &sink)
    .await
    .err()
    .expect("should fail");

  assert!(matches!(err, QueryError::InvalidConfig { .. }));
  assert_eq!(store.connect_count(), 0);
}

#[tokio::test]
async fn templated_statement_and_parameters_reach_the_store() {
  let store = MemoryStore::new();
  store.push_rows(vec![row(json!({"c_int": 3}))]);
  let (_dir, sink) = sink();

  let mut cfg = config(
    "SELECT c_string, c_int FROM {{ bucket }} WHERE c_string=$string AND c_int=$int",
    "FETCH_ONE",
  );
  cfg.parameters = Some(json!({"string": "Kestra Doc", "int": 3}));

  let renderer = Renderer::new(&json!({"bucket": "events"}));
  Query::new(cfg)
    .run(&renderer, &store, &sink)
    .await
    .expect("run");

  let executed = store.executed();
  assert_eq!(executed.len(), 1);
  assert_eq!(
    executed[0].0,
    "SELECT c_string, c_int FROM events WHERE c_string=$string AND c_int=$int"
  );
  match &executed[0].1 {
    Params::Named(map) => {
      assert_eq!(map["string"], "Kestra Doc");
      assert_eq!(map["int"], 3);
    }
    other => panic!("expected named params, got {:?}", other),
  }
}

#[tokio::test]
async fn positional_parameters_bind_in_sequence_order() {
  let store = MemoryStore::new();
  let (_dir, sink) = sink();

  let mut cfg = config("SELECT * FROM bucket WHERE c_string=? AND c_int=?", "NONE");
  cfg.parameters = Some(json!(["Kestra Doc", 3]));

  Query::new(cfg)
    .run(&Renderer::empty(), &store, &sink)
    .await
    .expect("run");

  match &store.executed()[0].1 {
    Params::Positional(seq) => assert_eq!(seq, &vec![json!("Kestra Doc"), json!(3)]),
    other => panic!("expected positional params, got {:?}", other),
  }
}

#[tokio::test]
async fn connection_failure_is_a_connection_error() {
  let store = MemoryStore::new();
  store.fail_connect("node down");
  let (_dir, sink) = sink();

  let err = Query::new(config("SELECT 1", "FETCH"))
    .run(&Renderer::empty(), &store, &sink)
    .await
    .err()
    .expect("should fail");

  assert!(matches!(err, QueryError::Connection { .. }));
  assert_eq!(store.close_count(), 0);
}
