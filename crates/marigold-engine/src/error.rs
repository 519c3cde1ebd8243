//! Execution errors.

use marigold_command::CommandError;
use marigold_graph::GraphError;

use crate::expression::ConditionError;
use crate::iteration::IterationError;

/// Errors that can occur while executing a flow.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
  /// The flow failed validation before anything ran.
  #[error("invalid flow: {0}")]
  InvalidFlow(#[from] GraphError),

  /// A referenced node does not exist.
  #[error("node '{node_id}' not found in flow")]
  NodeNotFound { node_id: String },

  /// The node has an empty command name.
  #[error("node '{node_id}' has no command")]
  MissingCommand { node_id: String },

  /// The command is neither built in nor registered.
  #[error("command '{command}' not found for node '{node_id}'")]
  CommandNotFound { node_id: String, command: String },

  /// A required anchor input was never connected.
  #[error("required input '{input}' of node '{node_id}' is not connected")]
  UnboundInput { node_id: String, input: String },

  /// An `_for` node without a node to iterate.
  #[error("node '{node_id}' has no iteration target")]
  MissingIterationTarget { node_id: String },

  /// A `_switch` condition could not be evaluated.
  #[error("condition '{condition}' of node '{node_id}' failed: {source}")]
  Condition {
    node_id: String,
    condition: String,
    #[source]
    source: ConditionError,
  },

  /// The `_for` collection cannot be iterated.
  #[error("node '{node_id}' cannot iterate its data: {source}")]
  Iteration {
    node_id: String,
    #[source]
    source: IterationError,
  },

  /// The invoked command returned an error.
  #[error("exec node '{node_id}' failed: {source}")]
  Command {
    node_id: String,
    #[source]
    source: CommandError,
  },

  /// A dependency of the node failed.
  #[error("node '{node_id}' input '{input}': {source}")]
  Upstream {
    node_id: String,
    input: String,
    #[source]
    source: Box<ExecError>,
  },

  /// An iteration of an `_for` node failed; partial results are discarded.
  #[error("loop '{node_id}' failed at item {index}: {source}")]
  Loop {
    node_id: String,
    index: usize,
    #[source]
    source: Box<ExecError>,
  },

  /// Recursion went deeper than the configured limit.
  #[error("recursion depth limit {limit} exceeded at node '{node_id}'")]
  DepthExceeded { node_id: String, limit: usize },

  /// Execution was cancelled.
  #[error("execution cancelled")]
  Cancelled,
}

impl ExecError {
  /// Wrap a dependency failure with the consuming node. Cancellation passes
  /// through untouched.
  pub(crate) fn upstream(node_id: &str, input: &str, source: ExecError) -> Self {
    match source {
      ExecError::Cancelled => ExecError::Cancelled,
      source => ExecError::Upstream {
        node_id: node_id.to_string(),
        input: input.to_string(),
        source: Box::new(source),
      },
    }
  }

  /// Wrap the failure of one `_for` iteration.
  pub(crate) fn in_loop(node_id: &str, index: usize, source: ExecError) -> Self {
    match source {
      ExecError::Cancelled => ExecError::Cancelled,
      source => ExecError::Loop {
        node_id: node_id.to_string(),
        index,
        source: Box::new(source),
      },
    }
  }

  /// The error that started the failure, below any `Upstream`/`Loop` wrappers.
  pub fn root_cause(&self) -> &ExecError {
    let mut current = self;
    loop {
      match current {
        ExecError::Upstream { source, .. } | ExecError::Loop { source, .. } => current = &**source,
        _ => return current,
      }
    }
  }

  /// Node where the failure originated, if it is attributable to one.
  pub fn node_id(&self) -> Option<&str> {
    match self.root_cause() {
      ExecError::NodeNotFound { node_id }
      | ExecError::MissingCommand { node_id }
      | ExecError::CommandNotFound { node_id, .. }
      | ExecError::UnboundInput { node_id, .. }
      | ExecError::MissingIterationTarget { node_id }
      | ExecError::Condition { node_id, .. }
      | ExecError::Iteration { node_id, .. }
      | ExecError::Command { node_id, .. }
      | ExecError::DepthExceeded { node_id, .. } => Some(node_id.as_str()),
      _ => None,
    }
  }

  /// Message for this frame alone. Wrappers name the node where the failure
  /// started instead of repeating the whole chain, so each frame's status
  /// stays short however deep the failure sits.
  pub fn frame_message(&self) -> String {
    let origin = self.node_id().unwrap_or("unknown");
    match self {
      ExecError::Upstream { node_id, input, .. } => {
        format!("node '{node_id}' input '{input}': upstream node '{origin}' failed")
      }
      ExecError::Loop { node_id, index, .. } => {
        format!("loop '{node_id}' failed at item {index}: node '{origin}' failed")
      }
      other => other.to_string(),
    }
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self.root_cause(), ExecError::Cancelled)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_root_cause_unwraps_nested_frames() {
    let err = ExecError::upstream(
      "c",
      "value",
      ExecError::upstream(
        "b",
        "text",
        ExecError::Command {
          node_id: "a".to_string(),
          source: CommandError::failed("boom"),
        },
      ),
    );

    assert_eq!(err.node_id(), Some("a"));
    assert!(matches!(err.root_cause(), ExecError::Command { .. }));
    assert_eq!(
      err.to_string(),
      "node 'c' input 'value': node 'b' input 'text': exec node 'a' failed: boom"
    );
  }

  #[test]
  fn test_frame_message_does_not_repeat_the_chain() {
    let leaf = ExecError::Command {
      node_id: "a".to_string(),
      source: CommandError::failed("boom"),
    };
    assert_eq!(leaf.frame_message(), "exec node 'a' failed: boom");

    let mut err = leaf;
    for i in 0..50 {
      err = ExecError::upstream(&format!("n{i}"), "x", err);
    }
    assert_eq!(
      err.frame_message(),
      "node 'n49' input 'x': upstream node 'a' failed"
    );
    assert!(err.to_string().len() > 50 * "node 'n0' input 'x': ".len());

    let missing = ExecError::NodeNotFound {
      node_id: "gone".to_string(),
    };
    let looped = ExecError::in_loop("l", 3, ExecError::upstream("n0", "x", missing));
    assert_eq!(
      looped.frame_message(),
      "loop 'l' failed at item 3: node 'gone' failed"
    );
  }

  #[test]
  fn test_cancellation_is_not_wrapped() {
    let err = ExecError::upstream("b", "text", ExecError::Cancelled);
    assert!(matches!(err, ExecError::Cancelled));
    assert!(err.is_cancelled());
    assert_eq!(err.node_id(), None);
  }
}
