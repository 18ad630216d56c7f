//! Query task error types.

use thiserror::Error;

/// Errors that can occur during a query task invocation.
///
/// None of these are retried here; all propagate to the caller (task
/// runner or trigger tick), which owns retry/backoff. An empty result
/// set is never an error.
#[derive(Debug, Error)]
pub enum QueryError {
  /// Template substitution failed. Raised before any connection attempt.
  #[error("template rendering failed for '{field}': {message}")]
  Render { field: String, message: String },

  /// A required configuration field was blank or unparseable after
  /// rendering.
  #[error("invalid configuration: {message}")]
  InvalidConfig { message: String },

  /// The target was unreachable, credentials were rejected, or the
  /// target string was malformed.
  #[error("connection failed: {message}")]
  Connection { message: String },

  /// The store rejected or failed the statement. The session is still
  /// closed.
  #[error("query execution failed: {message}")]
  Execution { message: String },

  /// Row encoding or blob transfer failed during `STORE`. No partial
  /// artifact remains visible.
  #[error("result serialization failed: {message}")]
  Serialization { message: String },
}

impl From<hibiscus_datastore::Error> for QueryError {
  fn from(err: hibiscus_datastore::Error) -> Self {
    match err {
      hibiscus_datastore::Error::Connection { message } => QueryError::Connection { message },
      hibiscus_datastore::Error::Query { message } => QueryError::Execution { message },
    }
  }
}
