//! Hibiscus Datastore
//!
//! This crate provides the document store protocol for Hibiscus query
//! tasks: opening a session against a target store, executing a
//! parameterized statement, and closing the session.
//!
//! The [`Store`] trait is the narrow seam the rest of the system depends
//! on: any store exposing connect/execute/close (document database, SQL
//! engine) is substitutable. Two implementations ship here:
//! - [`CouchbaseStore`], which talks to the Couchbase N1QL query service
//!   over HTTP
//! - [`MemoryStore`], a scriptable in-memory store for tests
//!
//! Rows are schemaless: each row is an ordered mapping from field name to
//! a dynamically-typed JSON value, with field order preserved as returned
//! by the store.

mod couchbase;
mod memory;
mod params;

pub use couchbase::CouchbaseStore;
pub use memory::MemoryStore;
pub use params::Params;

use async_trait::async_trait;

/// One schemaless record returned by a query.
///
/// Field order is preserved (`serde_json` with `preserve_order`); values
/// are the full JSON value tree (null, bool, number, string, array,
/// object).
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The target was unreachable, authentication was rejected, or the
  /// target string was malformed.
  #[error("connection failed: {message}")]
  Connection { message: String },

  /// The store rejected or failed the statement (syntax error,
  /// permission denial, timeout).
  #[error("query execution failed: {message}")]
  Query { message: String },
}

/// A store that can open query sessions.
#[async_trait]
pub trait Store: Send + Sync {
  /// Open a session against the target store.
  ///
  /// Fails with [`Error::Connection`] when the target is unreachable,
  /// authentication is rejected, or the target string is malformed.
  async fn connect(
    &self,
    target: &str,
    username: &str,
    password: &str,
  ) -> Result<Box<dyn Session>, Error>;
}

/// A live, single-use connection handle to the target store.
///
/// Sessions are opened, used, and closed within one invocation, never
/// reused across invocations or shared across concurrent invocations.
#[async_trait]
pub trait Session: Send {
  /// Execute a statement with bound parameters and collect the full row
  /// sequence eagerly, in the order returned by the store.
  async fn execute(&self, statement: &str, params: &Params) -> Result<Vec<Row>, Error>;

  /// Close the session, releasing all resources.
  ///
  /// Must be invoked exactly once per successful connect, including on
  /// every error path after connect succeeds.
  async fn close(self: Box<Self>) -> Result<(), Error>;
}
