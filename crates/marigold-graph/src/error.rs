use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
  #[error("node '{node_id}' input '{input}' references unknown node '{target}'")]
  UnknownAnchorTarget {
    node_id: String,
    input: String,
    target: String,
  },

  #[error("node '{node_id}' iterates over unknown node '{target}'")]
  UnknownIterationTarget { node_id: String, target: String },

  #[error("output node '{0}' not found in flow")]
  OutputNodeNotFound(String),

  #[error("dependency cycle detected: {}", .0.join(" -> "))]
  Cycle(Vec<String>),
}
