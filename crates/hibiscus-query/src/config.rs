//! Query configuration surface.

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Configuration recognized by the query task (and embedded by the
/// polling trigger).
///
/// All string fields are templates rendered fresh per invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
  /// Connection string used to locate the target store, e.g.
  /// `couchbase://localhost`.
  pub connection_string: String,

  /// Authentication username.
  pub username: String,

  /// Authentication password.
  pub password: String,

  /// Statement to run against the store.
  pub statement: String,

  /// Optional query parameters: a mapping binds named parameters, a
  /// sequence binds positional ones.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parameters: Option<serde_json::Value>,

  /// How to return or store query results, one of `FETCH`, `FETCH_ONE`,
  /// `STORE`, `NONE`. Renderable; defaults to `STORE`.
  #[serde(default = "default_fetch_mode")]
  pub fetch_mode: String,
}

fn default_fetch_mode() -> String {
  "STORE".to_string()
}

/// Reject blank values for a required field.
pub(crate) fn require_non_blank(field: &str, value: &str) -> Result<(), QueryError> {
  if value.trim().is_empty() {
    return Err(QueryError::InvalidConfig {
      message: format!("'{}' must not be blank", field),
    });
  }
  Ok(())
}
