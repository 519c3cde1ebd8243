use serde::{Deserialize, Serialize};

/// Configuration for the flow engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Maximum nesting of dependency pulls before a run is aborted.
  ///
  /// Every level is a nested future poll, so this bounds stack use. The
  /// default leaves headroom on a 2 MiB thread stack in unoptimized builds.
  pub max_depth: usize,

  /// Lower bound for the status channel created by `exec_flow`. The channel
  /// always holds at least two events per node.
  pub min_event_buffer: usize,
}

impl EngineConfig {
  /// Status channel capacity for a flow of `node_count` nodes.
  pub fn event_buffer(&self, node_count: usize) -> usize {
    node_count
      .saturating_mul(2)
      .max(self.min_event_buffer)
      .max(1)
  }
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      max_depth: 64,
      min_event_buffer: 64,
    }
  }
}
