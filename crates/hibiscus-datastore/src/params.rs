use serde_json::Value;

/// Bound query parameters.
///
/// Produced from the caller-supplied `parameters` value:
/// - a JSON object binds as named parameters, one binding per key, the
///   key used verbatim as the parameter name
/// - a JSON array binds as positional parameters in sequence order
/// - absent or any other shape binds an empty parameter set;
///   unparameterized queries are valid, so this is not an error
///
/// No validation against the statement text happens here; a mismatch
/// between bound parameters and placeholders is surfaced by the store at
/// execution time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
  /// No parameters bound.
  #[default]
  None,

  /// Named parameters, keyed by parameter name.
  Named(serde_json::Map<String, Value>),

  /// Positional parameters, in sequence order (1-indexed at the wire).
  Positional(Vec<Value>),
}

impl Params {
  /// Bind a caller-supplied value into a parameter set.
  pub fn bind(value: Option<&Value>) -> Self {
    match value {
      Some(Value::Object(map)) => Params::Named(map.clone()),
      Some(Value::Array(seq)) => Params::Positional(seq.clone()),
      _ => Params::None,
    }
  }

  /// Number of bindings in this parameter set.
  pub fn len(&self) -> usize {
    match self {
      Params::None => 0,
      Params::Named(map) => map.len(),
      Params::Positional(seq) => seq.len(),
    }
  }

  /// Whether this parameter set is empty.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
