//! The query task.

use hibiscus_datastore::{Params, Store};
use tracing::{info, instrument};

use crate::config::{QueryConfig, require_non_blank};
use crate::error::QueryError;
use crate::fetch::{FetchMode, Output, materialize};
use crate::render::Renderer;

/// Executes a parameterized statement against a document store and
/// shapes the result per the configured fetch mode.
///
/// One invocation is a single linear sequence: render, connect, bind,
/// execute, close, materialize. The session is private to the
/// invocation and closed exactly once on every path after a successful
/// connect.
pub struct Query {
  config: QueryConfig,
}

impl Query {
  /// Create a query task from its configuration.
  pub fn new(config: QueryConfig) -> Self {
    Self { config }
  }

  /// The task's configuration.
  pub fn config(&self) -> &QueryConfig {
    &self.config
  }

  /// Run the query once and materialize its output.
  #[instrument(name = "query_run", skip_all)]
  pub async fn run(
    &self,
    renderer: &Renderer,
    store: &dyn Store,
    sink: &dyn hibiscus_artifact::Store,
  ) -> Result<Output, QueryError> {
    // Every dynamic field is rendered independently, before any
    // connection attempt.
    let connection_string = renderer.render("connection_string", &self.config.connection_string)?;
    let username = renderer.render("username", &self.config.username)?;
    let password = renderer.render("password", &self.config.password)?;
    let statement = renderer.render("statement", &self.config.statement)?;
    let fetch_mode: FetchMode = renderer
      .render("fetch_mode", &self.config.fetch_mode)?
      .parse()?;

    require_non_blank("connection_string", &connection_string)?;
    require_non_blank("username", &username)?;
    require_non_blank("password", &password)?;
    require_non_blank("statement", &statement)?;

    let params = Params::bind(self.config.parameters.as_ref());

    let session = store
      .connect(&connection_string, &username, &password)
      .await?;

    // Rows are collected eagerly and the session closed before
    // materialization, so close runs on the execution-error path too.
    let executed = session.execute(&statement, &params).await;
    let closed = session.close().await;
    let rows = executed?;
    closed?;

    info!(row_count = rows.len(), fetch_mode = ?fetch_mode, "query executed");

    materialize(rows, fetch_mode, sink).await
  }
}
