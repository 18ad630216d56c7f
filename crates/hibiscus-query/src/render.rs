//! Template rendering using minijinja.
//!
//! Every dynamic configuration field (connection string, credentials,
//! statement, fetch mode) is a template rendered against the invocation's
//! variables before use. Rendering is an explicit pre-processing stage so
//! a substitution failure is a distinct, testable error kind raised
//! before any connection attempt.

use minijinja::Environment;

use crate::error::QueryError;

/// Renders configuration templates against a variable context.
pub struct Renderer {
  env: Environment<'static>,
  context: minijinja::Value,
}

impl Renderer {
  /// Create a renderer over the given variables.
  ///
  /// The variables become the template context, so `{{ name }}` resolves
  /// to `variables["name"]`.
  pub fn new(variables: &serde_json::Value) -> Self {
    Self {
      env: Environment::new(),
      context: minijinja::Value::from_serialize(variables),
    }
  }

  /// Renderer with an empty context; templates without placeholders
  /// pass through unchanged.
  pub fn empty() -> Self {
    Self::new(&serde_json::json!({}))
  }

  /// Render one template field.
  pub fn render(&self, field: &str, template: &str) -> Result<String, QueryError> {
    self
      .env
      .render_str(template, self.context.clone())
      .map_err(|e| QueryError::Render {
        field: field.to_string(),
        message: e.to_string(),
      })
  }
}
