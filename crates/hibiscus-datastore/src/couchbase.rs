//! Couchbase store implementation over the N1QL query service REST API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{Error, Params, Row, Session, Store};

/// Default query service port for `couchbase://` targets.
const QUERY_PORT: u16 = 8093;

/// Default query service port for `couchbases://` (TLS) targets.
const QUERY_PORT_TLS: u16 = 18093;

/// Store backed by the Couchbase query service.
///
/// Targets are connection strings of the form `couchbase://host[:port]`
/// (or `couchbases://` for TLS); an explicit `http(s)://` URL pointing at
/// the query service is also accepted. Statements are executed via
/// `POST /query/service` with basic authentication.
#[derive(Debug, Default)]
pub struct CouchbaseStore;

impl CouchbaseStore {
  pub fn new() -> Self {
    Self
  }
}

#[async_trait]
impl Store for CouchbaseStore {
  async fn connect(
    &self,
    target: &str,
    username: &str,
    password: &str,
  ) -> Result<Box<dyn Session>, Error> {
    let base = query_service_base(target)?;
    let client = reqwest::Client::new();

    // The query service enforces authentication on every statement, so a
    // trivial one validates both reachability and credentials up front.
    let response = client
      .post(format!("{}/query/service", base))
      .basic_auth(username, Some(password))
      .json(&request_body("SELECT 1", &Params::None))
      .send()
      .await
      .map_err(|e| Error::Connection {
        message: format!("target '{}' unreachable: {}", target, e),
      })?;

    let status = response.status();
    if auth_rejected(status) {
      return Err(Error::Connection {
        message: format!(
          "target '{}' rejected credentials for user '{}': http status {}",
          target, username, status
        ),
      });
    }
    if !status.is_success() {
      return Err(Error::Connection {
        message: format!(
          "target '{}' rejected connection: http status {}",
          target, status
        ),
      });
    }

    Ok(Box::new(CouchbaseSession {
      client,
      base,
      username: username.to_string(),
      password: password.to_string(),
    }))
  }
}

/// A live session against one query service endpoint.
pub struct CouchbaseSession {
  client: reqwest::Client,
  base: String,
  username: String,
  password: String,
}

#[async_trait]
impl Session for CouchbaseSession {
  async fn execute(&self, statement: &str, params: &Params) -> Result<Vec<Row>, Error> {
    debug!(statement = %statement, bindings = params.len(), "executing statement");

    let body = request_body(statement, params);
    let response = self
      .client
      .post(format!("{}/query/service", self.base))
      .basic_auth(&self.username, Some(&self.password))
      .json(&body)
      .send()
      .await
      .map_err(|e| Error::Query {
        message: format!("query service request failed: {}", e),
      })?;

    let status = response.status();
    if auth_rejected(status) {
      // Credentials can be revoked mid-session; that is a connection
      // fault, not a statement fault.
      return Err(Error::Connection {
        message: format!("query service rejected credentials: http status {}", status),
      });
    }
    let payload: QueryResponse = response.json().await.map_err(|e| Error::Query {
      message: format!("invalid query service response: {}", e),
    })?;

    if let Some(err) = payload.errors.first() {
      return Err(Error::Query {
        message: format!("[{}] {}", err.code, err.msg),
      });
    }
    if !status.is_success() {
      return Err(Error::Query {
        message: format!("query service returned http status {}", status),
      });
    }

    payload
      .results
      .into_iter()
      .map(|value| match value {
        Value::Object(row) => Ok(row),
        other => Err(Error::Query {
          message: format!("expected object row, got {}", other),
        }),
      })
      .collect()
  }

  async fn close(self: Box<Self>) -> Result<(), Error> {
    // The HTTP client owns the connection pool; dropping it releases
    // all network handles.
    drop(self);
    Ok(())
  }
}

/// Whether an HTTP status signals rejected credentials.
fn auth_rejected(status: reqwest::StatusCode) -> bool {
  status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
}

/// Resolve a connection target to the query service base URL.
fn query_service_base(target: &str) -> Result<String, Error> {
  let malformed = |detail: &str| Error::Connection {
    message: format!("malformed connection target '{}': {}", target, detail),
  };

  let url = reqwest::Url::parse(target).map_err(|e| malformed(&e.to_string()))?;
  let host = url.host_str().ok_or_else(|| malformed("missing host"))?;

  let (scheme, default_port) = match url.scheme() {
    "couchbase" => ("http", QUERY_PORT),
    "couchbases" => ("https", QUERY_PORT_TLS),
    "http" => ("http", QUERY_PORT),
    "https" => ("https", QUERY_PORT_TLS),
    other => return Err(malformed(&format!("unsupported scheme '{}'", other))),
  };
  let port = url.port().unwrap_or(default_port);

  Ok(format!("{}://{}:{}", scheme, host, port))
}

/// Build the query service request body.
///
/// Named parameters become `$name` top-level fields (names used verbatim,
/// the `$` added if absent); positional parameters become the `args`
/// array, in sequence order.
fn request_body(statement: &str, params: &Params) -> serde_json::Map<String, Value> {
  let mut body = serde_json::Map::new();
  body.insert("statement".to_string(), Value::String(statement.to_string()));

  match params {
    Params::Named(map) => {
      for (name, value) in map {
        let field = if name.starts_with('$') {
          name.clone()
        } else {
          format!("${}", name)
        };
        body.insert(field, value.clone());
      }
    }
    Params::Positional(seq) => {
      body.insert("args".to_string(), Value::Array(seq.clone()));
    }
    Params::None => {}
  }

  body
}

/// Query service response envelope.
#[derive(Debug, Deserialize)]
struct QueryResponse {
  #[serde(default)]
  results: Vec<Value>,
  #[serde(default)]
  errors: Vec<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
  #[serde(default)]
  code: i64,
  msg: String,
}
