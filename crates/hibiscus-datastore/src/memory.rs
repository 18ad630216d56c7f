//! Scriptable in-memory store for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{Error, Params, Row, Session, Store};

/// In-memory store with scripted results and fault injection.
///
/// Each `execute` consumes the next scripted outcome (rows or an
/// injected execution failure); an empty script yields an empty result
/// set. Connect and close invocations are counted so tests can assert
/// the session lifecycle (close exactly once, including on error paths).
#[derive(Default)]
pub struct MemoryStore {
  inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
  script: Mutex<VecDeque<Scripted>>,
  connect_failure: Mutex<Option<String>>,
  connects: AtomicUsize,
  closes: AtomicUsize,
  executed: Mutex<Vec<(String, Params)>>,
}

enum Scripted {
  Rows(Vec<Row>),
  Fail(String),
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Script the next execution to return the given rows.
  pub fn push_rows(&self, rows: Vec<Row>) {
    self
      .inner
      .script
      .lock()
      .expect("script lock")
      .push_back(Scripted::Rows(rows));
  }

  /// Script the next execution to fail with an execution error.
  pub fn push_error(&self, message: impl Into<String>) {
    self
      .inner
      .script
      .lock()
      .expect("script lock")
      .push_back(Scripted::Fail(message.into()));
  }

  /// Make every subsequent connect fail with a connection error.
  pub fn fail_connect(&self, message: impl Into<String>) {
    *self.inner.connect_failure.lock().expect("failure lock") = Some(message.into());
  }

  /// Number of successful connects so far.
  pub fn connect_count(&self) -> usize {
    self.inner.connects.load(Ordering::SeqCst)
  }

  /// Number of session closes so far.
  pub fn close_count(&self) -> usize {
    self.inner.closes.load(Ordering::SeqCst)
  }

  /// Statements executed so far, with their bound parameters.
  pub fn executed(&self) -> Vec<(String, Params)> {
    self.inner.executed.lock().expect("executed lock").clone()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn connect(
    &self,
    _target: &str,
    _username: &str,
    _password: &str,
  ) -> Result<Box<dyn Session>, Error> {
    if let Some(message) = self
      .inner
      .connect_failure
      .lock()
      .expect("failure lock")
      .clone()
    {
      return Err(Error::Connection { message });
    }

    self.inner.connects.fetch_add(1, Ordering::SeqCst);
    Ok(Box::new(MemorySession {
      inner: self.inner.clone(),
    }))
  }
}

struct MemorySession {
  inner: Arc<Inner>,
}

#[async_trait]
impl Session for MemorySession {
  async fn execute(&self, statement: &str, params: &Params) -> Result<Vec<Row>, Error> {
    self
      .inner
      .executed
      .lock()
      .expect("executed lock")
      .push((statement.to_string(), params.clone()));

    match self.inner.script.lock().expect("script lock").pop_front() {
      Some(Scripted::Rows(rows)) => Ok(rows),
      Some(Scripted::Fail(message)) => Err(Error::Query { message }),
      None => Ok(Vec::new()),
    }
  }

  async fn close(self: Box<Self>) -> Result<(), Error> {
    self.inner.closes.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}
