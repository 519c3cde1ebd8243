//! Per-run memoization of node outcomes.
//!
//! Every node id maps to an async once-cell, so concurrent pulls of the same
//! node share one execution and later pulls read the stored outcome. The
//! cache lives for exactly one run.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use marigold_command::Outputs;
use tokio::sync::OnceCell;

/// Result of executing a node that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
  /// The node produced outputs.
  Value(Arc<Outputs>),
  /// The node was never meant to run; consumers see no value.
  Unreachable,
}

impl NodeOutcome {
  pub fn value(outputs: Outputs) -> Self {
    Self::Value(Arc::new(outputs))
  }

  pub fn outputs(&self) -> Option<&Outputs> {
    match self {
      NodeOutcome::Value(outputs) => Some(outputs),
      NodeOutcome::Unreachable => None,
    }
  }

  pub fn is_unreachable(&self) -> bool {
    matches!(self, NodeOutcome::Unreachable)
  }
}

/// Thread-safe node_id -> outcome store for one run.
#[derive(Debug, Default)]
pub struct ExecutionCache {
  entries: Mutex<HashMap<String, Arc<OnceCell<NodeOutcome>>>>,
}

impl ExecutionCache {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<OnceCell<NodeOutcome>>>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Get a stored outcome without executing anything.
  pub fn get(&self, node_id: &str) -> Option<NodeOutcome> {
    self
      .lock()
      .get(node_id)
      .and_then(|cell| cell.get().cloned())
  }

  /// Get the stored outcome for `node_id`, or run `exec` and store its
  /// outcome. Errors are returned without being stored.
  pub async fn get_or_exec<F, Fut, E>(&self, node_id: &str, exec: F) -> Result<NodeOutcome, E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<NodeOutcome, E>>,
  {
    let cell = {
      let mut entries = self.lock();
      entries.entry(node_id.to_string()).or_default().clone()
    };

    cell.get_or_try_init(exec).await.cloned()
  }

  /// Number of nodes with a stored outcome.
  pub fn len(&self) -> usize {
    self
      .lock()
      .values()
      .filter(|cell| cell.initialized())
      .count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
