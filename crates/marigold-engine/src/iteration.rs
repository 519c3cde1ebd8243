//! Collection adapters for `_for` nodes.

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum IterationError {
  #[error("cannot iterate over {kind}")]
  NotIterable { kind: &'static str },

  #[error("{0}")]
  Other(String),
}

/// Turns the `_for` collection into the ordered elements to iterate.
pub trait IterationAdapter: Send + Sync {
  fn elements(&self, collection: &Value) -> Result<Vec<Value>, IterationError>;
}

/// Iterates JSON values: arrays in order, objects by value in key order,
/// `null` as empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonIteration;

impl IterationAdapter for JsonIteration {
  fn elements(&self, collection: &Value) -> Result<Vec<Value>, IterationError> {
    match collection {
      Value::Array(items) => Ok(items.clone()),
      Value::Object(map) => Ok(map.values().cloned().collect()),
      Value::Null => Ok(Vec::new()),
      Value::Bool(_) => Err(IterationError::NotIterable { kind: "bool" }),
      Value::Number(_) => Err(IterationError::NotIterable { kind: "number" }),
      Value::String(_) => Err(IterationError::NotIterable { kind: "string" }),
    }
  }
}
