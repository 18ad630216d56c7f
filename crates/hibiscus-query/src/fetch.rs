//! Result materialization.
//!
//! A query's collected row sequence is reshaped into one of four output
//! contracts selected by [`FetchMode`]: all rows inline, the first row
//! only, a spill to the storage sink addressed by URI, or a bare count.
//! The mode enum is closed and matched exhaustively; new modes extend the
//! enum and the match.

use std::str::FromStr;

use futures::StreamExt;
use hibiscus_datastore::Row;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::QueryError;

/// Selector determining how a query's result rows are exposed.
///
/// Carried as a rendered string in the task config and parsed via
/// [`FromStr`], which is the single parse path for mode names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
  /// Return all rows inline.
  Fetch,

  /// Return the first row only, or nothing when the result is empty.
  FetchOne,

  /// Persist all rows to the storage sink and return the blob's URI.
  #[default]
  Store,

  /// Discard rows; only the count is reported.
  None,
}

impl FromStr for FetchMode {
  type Err = QueryError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "FETCH" => Ok(FetchMode::Fetch),
      "FETCH_ONE" => Ok(FetchMode::FetchOne),
      "STORE" => Ok(FetchMode::Store),
      "NONE" => Ok(FetchMode::None),
      other => Err(QueryError::InvalidConfig {
        message: format!(
          "unknown fetch mode '{}', expected FETCH, FETCH_ONE, STORE or NONE",
          other
        ),
      }),
    }
  }
}

/// Output of a query task invocation.
///
/// Exactly one of `rows`, `row`, `uri` is populated, selected by the
/// fetch mode (`NONE` populates none of them). `size` is always the full
/// result-set length regardless of mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Output {
  /// All fetched rows. Only populated under `FETCH`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rows: Option<Vec<Row>>,

  /// The first fetched row. Only populated under `FETCH_ONE` with a
  /// non-empty result.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub row: Option<Row>,

  /// URI of the stored result blob. Only populated under `STORE`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub uri: Option<String>,

  /// Number of rows in the result set.
  pub size: u64,
}

/// Shape a collected row sequence according to the fetch mode.
///
/// The sink is only touched under [`FetchMode::Store`].
pub async fn materialize(
  rows: Vec<Row>,
  mode: FetchMode,
  sink: &dyn hibiscus_artifact::Store,
) -> Result<Output, QueryError> {
  let size = rows.len() as u64;

  match mode {
    FetchMode::Fetch => Ok(Output {
      rows: Some(rows),
      size,
      ..Output::default()
    }),

    // The count stays the full result-set length even though only one
    // row is surfaced, so callers can tell "exactly one match" from
    // "many matches, first shown".
    FetchMode::FetchOne => Ok(Output {
      row: rows.into_iter().next(),
      size,
      ..Output::default()
    }),

    FetchMode::Store => {
      let uri = spill(&rows, sink).await?;
      Ok(Output {
        uri: Some(uri),
        size,
        ..Output::default()
      })
    }

    FetchMode::None => Ok(Output {
      size,
      ..Output::default()
    }),
  }
}

/// Spill rows to the storage sink as newline-delimited JSON.
///
/// Rows are encoded one record per line, in order, into a task-scoped
/// temporary file; the file is fully flushed and closed before the
/// transfer starts and removed afterward regardless of outcome.
async fn spill(rows: &[Row], sink: &dyn hibiscus_artifact::Store) -> Result<String, QueryError> {
  let serialization = |message: String| QueryError::Serialization { message };

  let temp = tempfile::Builder::new()
    .prefix("query-rows-")
    .suffix(".jsonl")
    .tempfile()
    .map_err(|e| serialization(format!("failed to allocate spill file: {}", e)))?;

  let mut file = tokio::fs::File::create(temp.path())
    .await
    .map_err(|e| serialization(format!("failed to open spill file: {}", e)))?;

  for row in rows {
    let mut line = serde_json::to_vec(row)
      .map_err(|e| serialization(format!("failed to encode row: {}", e)))?;
    line.push(b'\n');
    file
      .write_all(&line)
      .await
      .map_err(|e| serialization(format!("failed to write spill file: {}", e)))?;
  }

  file
    .flush()
    .await
    .map_err(|e| serialization(format!("failed to flush spill file: {}", e)))?;
  drop(file);

  let key = format!("queries/{}.jsonl", uuid::Uuid::new_v4());
  debug!(key = %key, records = rows.len(), "transferring spilled rows");

  let reader = tokio::fs::File::open(temp.path())
    .await
    .map_err(|e| serialization(format!("failed to reopen spill file: {}", e)))?;
  let stream = ReaderStream::new(reader).map(|r| r.map_err(hibiscus_artifact::Error::Io));

  sink
    .put(&key, Box::pin(stream), "application/x-ndjson")
    .await
    .map_err(|e| serialization(format!("blob transfer failed: {}", e)))
}

#[cfg(test)]
mod tests {
  use hibiscus_artifact::FsStore;
  use serde_json::json;

  use super::*;

  fn row(value: serde_json::Value) -> Row {
    value.as_object().expect("object row").clone()
  }

  fn sample_rows() -> Vec<Row> {
    vec![
      row(json!({"c_string": "Kestra Doc", "c_int": 3})),
      row(json!({"c_string": "Another Kestra Doc", "c_int": 7})),
      row(json!({"c_string": "Third", "c_int": 11})),
    ]
  }

  fn throwaway_sink() -> (tempfile::TempDir, FsStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let sink = FsStore::new(dir.path());
    (dir, sink)
  }

  #[tokio::test]
  async fn fetch_returns_rows_in_store_order() {
    let (_dir, sink) = throwaway_sink();
    let output = materialize(sample_rows(), FetchMode::Fetch, &sink)
      .await
      .expect("materialize");

    assert_eq!(output.size, 3);
    assert!(output.row.is_none());
    assert!(output.uri.is_none());

    let rows = output.rows.expect("rows populated");
    let ints: Vec<_> = rows.iter().map(|r| r["c_int"].clone()).collect();
    assert_eq!(ints, vec![json!(3), json!(7), json!(11)]);
  }

  #[tokio::test]
  async fn fetch_one_surfaces_first_row_with_full_count() {
    let (_dir, sink) = throwaway_sink();
    let output = materialize(sample_rows(), FetchMode::FetchOne, &sink)
      .await
      .expect("materialize");

    // size reflects the true result-set size, not 0/1.
    assert_eq!(output.size, 3);
    assert_eq!(output.row.expect("row populated")["c_string"], "Kestra Doc");
    assert!(output.rows.is_none());
    assert!(output.uri.is_none());
  }

  #[tokio::test]
  async fn fetch_one_on_empty_result_is_absent() {
    let (_dir, sink) = throwaway_sink();
    let output = materialize(Vec::new(), FetchMode::FetchOne, &sink)
      .await
      .expect("materialize");

    assert_eq!(output.size, 0);
    assert!(output.row.is_none());
  }

  #[tokio::test]
  async fn none_populates_only_the_count() {
    let (_dir, sink) = throwaway_sink();
    let output = materialize(sample_rows(), FetchMode::None, &sink)
      .await
      .expect("materialize");

    assert_eq!(output.size, 3);
    assert!(output.rows.is_none());
    assert!(output.row.is_none());
    assert!(output.uri.is_none());
  }

  #[test]
  fn fetch_mode_parses_the_closed_set() {
    assert_eq!("FETCH".parse::<FetchMode>().unwrap(), FetchMode::Fetch);
    assert_eq!("FETCH_ONE".parse::<FetchMode>().unwrap(), FetchMode::FetchOne);
    assert_eq!("STORE".parse::<FetchMode>().unwrap(), FetchMode::Store);
    assert_eq!("NONE".parse::<FetchMode>().unwrap(), FetchMode::None);
    assert!(matches!(
      "ALL".parse::<FetchMode>(),
      Err(QueryError::InvalidConfig { .. })
    ));
  }
}
